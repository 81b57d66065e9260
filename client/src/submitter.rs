use common::{
    ApplicationId, Counters, DriverParameters, FinalState, JobSubmission,
    YarnJobSubmissionParameters,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::command::JobCommandProvider;
use crate::error::SubmitError;
use crate::request::build_submit_application;
use crate::rm::{validate_application_id, ResourceManager};
use crate::stager::{
    create_staging_folder, prepare_driver_folder, write_submission_parameters, StageError,
};
use crate::uploader::{job_submission_remote_directory, JobResourceUploader};

pub const SUBMISSIONS_COUNTER: &str = "submissions";
pub const FAILED_SUBMISSIONS_COUNTER: &str = "submissions.failed";

/// Envía jobs al resource manager.
///
/// Cada `submit` corre sus pasos en orden (configuración, id, staging, subida,
/// envío) y corta en el primer error. No guarda estado entre envíos, así que
/// se puede compartir entre tareas concurrentes.
pub struct JobSubmitter<R, U, C> {
    rm: R,
    uploader: U,
    command_provider: C,
    job_submission_directory_prefix: String,
    staging_root: PathBuf,
    counters: Counters,
}

impl<R, U, C> JobSubmitter<R, U, C>
where
    R: ResourceManager,
    U: JobResourceUploader,
    C: JobCommandProvider,
{
    pub fn new(
        rm: R,
        uploader: U,
        command_provider: C,
        job_submission_directory_prefix: impl Into<String>,
        staging_root: impl Into<PathBuf>,
    ) -> Self {
        let counters = Counters::new();
        counters.try_register(SUBMISSIONS_COUNTER, "envíos intentados");
        counters.try_register(FAILED_SUBMISSIONS_COUNTER, "envíos fallidos");

        Self {
            rm,
            uploader,
            command_provider,
            job_submission_directory_prefix: job_submission_directory_prefix.into(),
            staging_root: staging_root.into(),
            counters,
        }
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub fn staging_root(&self) -> &Path {
        &self.staging_root
    }

    /// Envía el job y devuelve el id de la aplicación aceptada.
    ///
    /// Si algo falla después de pedir el id, la aplicación queda asignada en el
    /// RM tal como esté; no se intenta deshacer nada.
    pub async fn submit(&self, job: &JobSubmission) -> Result<ApplicationId, SubmitError> {
        self.counters.increment(SUBMISSIONS_COUNTER, 1);

        let result = self.run_submission(job).await;
        if let Err(e) = &result {
            self.counters.increment(FAILED_SUBMISSIONS_COUNTER, 1);
            warn!("falló el envío del job {}: {}", job.job_identifier(), e);
        }
        result
    }

    async fn run_submission(&self, job: &JobSubmission) -> Result<ApplicationId, SubmitError> {
        let job_id = job.job_identifier().to_string();

        // la configuración se valida antes de tocar el RM
        let driver = DriverParameters::resolve(job.driver_configurations())?;

        // 1) id de aplicación
        let new_app = self
            .rm
            .new_application()
            .await
            .map_err(SubmitError::Allocation)?;
        let application_id = new_app.application_id;
        validate_application_id(&application_id).map_err(SubmitError::Allocation)?;

        // 2) directorio remoto del envío
        let remote_directory =
            job_submission_remote_directory(&self.job_submission_directory_prefix, &application_id);

        // 3..6) carpeta local, archivos, parámetros (E/S bloqueante)
        let staging_root = self.staging_root.clone();
        let staged_job = job.clone();
        let staged_app = application_id.clone();
        let staged_remote = remote_directory.clone();
        let folder = tokio::task::spawn_blocking(move || {
            stage(&staged_job, &driver, &staging_root, &staged_app, &staged_remote)
        })
        .await
        .map_err(|e| SubmitError::Staging(StageError::Interrupted(e.to_string())))??;

        info!("carpeta del driver preparada en {}", folder.display());

        // 7) subida
        let resource = self
            .uploader
            .upload_job_resource(&folder, &remote_directory)
            .await
            .map_err(|source| {
                warn!(
                    "la aplicación {} queda asignada sin enviar (falló la subida)",
                    application_id
                );
                SubmitError::Upload {
                    application_id: application_id.clone(),
                    source,
                }
            })?;

        // 8) descriptor y envío
        info!("id de aplicación asignado {}", application_id);

        let command = self.command_provider.job_submission_command();
        info!("comando para YARN: {}", command);
        info!("MaxApplicationSubmissions: {}", driver.max_application_submissions);
        info!("archivo del driver en {}", resource.remote_upload_path);

        let request = build_submit_application(
            job,
            &application_id,
            driver.max_application_submissions,
            &resource,
            command,
        );

        self.rm
            .submit_application(&request)
            .await
            .map_err(|source| SubmitError::Submission {
                application_id: application_id.clone(),
                source,
            })?;

        info!("aplicación {} enviada (job {})", application_id, job_id);
        Ok(application_id)
    }

    /// Consulta de solo lectura del estado final de una aplicación.
    pub async fn get_job_final_status(&self, application_id: &str) -> Result<FinalState, SubmitError> {
        let status_error = |source| SubmitError::StatusQuery {
            application_id: application_id.to_string(),
            source,
        };

        validate_application_id(application_id).map_err(status_error)?;
        let app = self
            .rm
            .get_application(application_id)
            .await
            .map_err(status_error)?;
        Ok(app.final_status)
    }
}

fn stage(
    job: &JobSubmission,
    driver: &DriverParameters,
    staging_root: &Path,
    application_id: &str,
    remote_directory: &str,
) -> Result<PathBuf, StageError> {
    let folder = create_staging_folder(staging_root, job.job_identifier(), application_id)?;
    prepare_driver_folder(job, &folder)?;

    let params = YarnJobSubmissionParameters::new(
        job.job_identifier(),
        job.driver_memory_mb(),
        driver,
        &folder.to_string_lossy(),
        remote_directory,
    );
    write_submission_parameters(&folder, &params)?;

    Ok(folder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::YarnJobCommandProvider;
    use crate::error::ErrorKind;
    use crate::rm::RmError;
    use crate::uploader::{JobResource, UploadError};
    use async_trait::async_trait;
    use common::{
        Application, ApplicationState, ConfigurationFragment, NewApplication,
        SubmitApplication,
    };
    use std::{
        collections::HashMap,
        env, fs, io,
        sync::{Arc, Mutex},
    };

    /* ---------- fakes ---------- */

    #[derive(Default)]
    struct FakeRmState {
        fixed_id: Option<String>,
        next_seq: u32,
        fail_allocation: bool,
        fail_submit: bool,
        calls: Vec<&'static str>,
        submitted: Vec<SubmitApplication>,
        final_states: HashMap<String, FinalState>,
    }

    #[derive(Clone, Default)]
    struct FakeRm {
        state: Arc<Mutex<FakeRmState>>,
    }

    impl FakeRm {
        fn with_fixed_id(id: &str) -> Self {
            let rm = FakeRm::default();
            rm.state.lock().unwrap().fixed_id = Some(id.to_string());
            rm
        }

        fn calls(&self) -> Vec<&'static str> {
            self.state.lock().unwrap().calls.clone()
        }

        fn submitted(&self) -> Vec<SubmitApplication> {
            self.state.lock().unwrap().submitted.clone()
        }
    }

    #[async_trait]
    impl ResourceManager for FakeRm {
        async fn new_application(&self) -> Result<NewApplication, RmError> {
            let mut s = self.state.lock().unwrap();
            s.calls.push("new_application");
            if s.fail_allocation {
                return Err(RmError::Status {
                    url: "fake".to_string(),
                    status: 503,
                    body: "rm no disponible".to_string(),
                });
            }
            s.next_seq += 1;
            let id = s
                .fixed_id
                .clone()
                .unwrap_or_else(|| format!("application_1_{:04}", s.next_seq));
            Ok(NewApplication {
                application_id: id,
                maximum_resource_capability: None,
            })
        }

        async fn submit_application(&self, request: &SubmitApplication) -> Result<(), RmError> {
            let mut s = self.state.lock().unwrap();
            s.calls.push("submit_application");
            if s.fail_submit {
                return Err(RmError::Status {
                    url: "fake".to_string(),
                    status: 400,
                    body: "cola inexistente".to_string(),
                });
            }
            s.final_states
                .insert(request.application_id.clone(), FinalState::Undefined);
            s.submitted.push(request.clone());
            Ok(())
        }

        async fn get_application(&self, application_id: &str) -> Result<Application, RmError> {
            let mut s = self.state.lock().unwrap();
            s.calls.push("get_application");
            let final_status = *s
                .final_states
                .get(application_id)
                .ok_or_else(|| RmError::UnknownApplication(application_id.to_string()))?;
            Ok(Application {
                id: application_id.to_string(),
                name: String::new(),
                state: ApplicationState::Accepted,
                final_status,
                progress: 0.0,
                queue: None,
                application_type: None,
                tracking_url: None,
                diagnostics: None,
            })
        }
    }

    #[derive(Debug, Clone)]
    struct UploadCall {
        folder: PathBuf,
        remote_directory: String,
        params_present: bool,
    }

    #[derive(Clone, Default)]
    struct FakeUploader {
        fail: bool,
        calls: Arc<Mutex<Vec<UploadCall>>>,
    }

    #[async_trait]
    impl JobResourceUploader for FakeUploader {
        async fn upload_job_resource(
            &self,
            local_folder: &Path,
            remote_directory: &str,
        ) -> Result<JobResource, UploadError> {
            self.calls.lock().unwrap().push(UploadCall {
                folder: local_folder.to_path_buf(),
                remote_directory: remote_directory.to_string(),
                params_present: local_folder
                    .join("reef/local/job-submission-params.json")
                    .is_file(),
            });
            if self.fail {
                return Err(UploadError::Io {
                    path: local_folder.to_path_buf(),
                    source: io::Error::new(io::ErrorKind::Other, "dfs caído"),
                });
            }
            Ok(JobResource {
                remote_upload_path: remote_directory.trim_end_matches('/').to_string(),
                resource_size: 2048,
                last_modification_unix_timestamp: 1234567890,
            })
        }
    }

    /* ---------- helpers ---------- */

    fn temp_dir(sub: &str) -> PathBuf {
        let base = env::temp_dir().join("submitter_tests").join(sub);
        let _ = fs::remove_dir_all(&base);
        fs::create_dir_all(&base).unwrap();
        base
    }

    fn scenario_config() -> ConfigurationFragment {
        ConfigurationFragment::new()
            .set("TcpPortRangeStart", 8000)
            .set("TcpPortRangeCount", 10)
            .set("TcpPortRangeTryCount", 5)
            .set("MaxApplicationSubmissions", 2)
            .set("DriverRestartEvaluatorRecoverySeconds", 0)
    }

    fn job(id: &str) -> JobSubmission {
        JobSubmission::builder()
            .job_identifier(id)
            .driver_memory_mb(512)
            .add_driver_configuration(scenario_config())
            .build()
            .unwrap()
    }

    fn submitter(
        rm: &FakeRm,
        uploader: &FakeUploader,
        root: &Path,
    ) -> JobSubmitter<FakeRm, FakeUploader, YarnJobCommandProvider> {
        JobSubmitter::new(
            rm.clone(),
            uploader.clone(),
            YarnJobCommandProvider::default(),
            "/remote",
            root,
        )
    }

    /* ---------- tests ---------- */

    #[tokio::test]
    async fn escenario_basico_envia_la_aplicacion() {
        let root = temp_dir("basico");
        let rm = FakeRm::with_fixed_id("app_001");
        let uploader = FakeUploader::default();
        let s = submitter(&rm, &uploader, &root);

        let app_id = s.submit(&job("job1")).await.unwrap();
        assert_eq!(app_id, "app_001");

        // carpeta de staging y descriptor
        let folder = root.join("reef-job1-app_001");
        assert!(folder.is_dir());
        let params = YarnJobSubmissionParameters::from_json_slice(
            &fs::read(folder.join("reef/local/job-submission-params.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(params.driver_memory, 512);
        assert_eq!(params.driver_recovery_timeout, 0);
        assert_eq!(params.dfs_job_submission_folder, "/remote/app_001/");
        assert_eq!(params.shared_job_submission_parameters.job_id, "job1");
        assert_eq!(params.shared_job_submission_parameters.tcp_begin_port, 8000);
        assert_eq!(params.shared_job_submission_parameters.tcp_range_count, 10);
        assert_eq!(params.shared_job_submission_parameters.tcp_try_count, 5);

        // la subida ve la carpeta completa
        let uploads = uploader.calls.lock().unwrap().clone();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].folder, folder);
        assert_eq!(uploads[0].remote_directory, "/remote/app_001/");
        assert!(uploads[0].params_present);

        // descriptor enviado
        assert_eq!(rm.calls(), vec!["new_application", "submit_application"]);
        let submitted = rm.submitted();
        assert_eq!(submitted.len(), 1);
        let req = &submitted[0];
        assert_eq!(req.application_id, "app_001");
        assert_eq!(req.am_resource.memory_mb, 512);
        assert_eq!(req.am_resource.vcores, 1);
        assert_eq!(req.max_app_attempts, 2);
        let entries = &req.am_container_spec.local_resources.entries;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].value.resource, "/remote/app_001");
        assert_eq!(entries[0].value.size, 2048);
        assert_eq!(entries[0].value.timestamp, 1234567890);
        assert!(req
            .am_container_spec
            .commands
            .command
            .contains("reef/local/job-submission-params.json"));

        assert_eq!(s.counters().value(SUBMISSIONS_COUNTER), Some(1));
        assert_eq!(s.counters().value(FAILED_SUBMISSIONS_COUNTER), Some(0));
    }

    #[tokio::test]
    async fn carpeta_existente_es_colision_y_no_sube_ni_envia() {
        let root = temp_dir("colision");
        fs::create_dir_all(root.join("reef-job1-app_001")).unwrap();

        let rm = FakeRm::with_fixed_id("app_001");
        let uploader = FakeUploader::default();
        let s = submitter(&rm, &uploader, &root);

        let err = s.submit(&job("job1")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StagingCollision);
        assert_eq!(rm.calls(), vec!["new_application"]);
        assert!(uploader.calls.lock().unwrap().is_empty());
        // no se escribió nada dentro de la carpeta ajena
        assert!(!root
            .join("reef-job1-app_001/reef/local/job-submission-params.json")
            .exists());
        assert_eq!(s.counters().value(FAILED_SUBMISSIONS_COUNTER), Some(1));
    }

    #[tokio::test]
    async fn reintentar_la_misma_pareja_choca_y_no_reescribe() {
        let root = temp_dir("reintento");
        let rm = FakeRm::with_fixed_id("app_001");
        let uploader = FakeUploader::default();
        let s = submitter(&rm, &uploader, &root);

        s.submit(&job("job1")).await.unwrap();
        let params_path = root.join("reef-job1-app_001/reef/local/job-submission-params.json");
        let first = fs::read(&params_path).unwrap();

        let err = s.submit(&job("job1")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StagingCollision);
        assert_eq!(fs::read(&params_path).unwrap(), first);
        assert_eq!(rm.submitted().len(), 1);
    }

    #[tokio::test]
    async fn configuracion_incompleta_falla_antes_de_hablar_con_el_rm() {
        let root = temp_dir("config");
        let rm = FakeRm::with_fixed_id("app_001");
        let uploader = FakeUploader::default();
        let s = submitter(&rm, &uploader, &root);

        let job = JobSubmission::builder()
            .job_identifier("job1")
            .add_driver_configuration(ConfigurationFragment::new().set("TcpPortRangeStart", 8000))
            .build()
            .unwrap();

        let err = s.submit(&job).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(rm.calls().is_empty());
        assert!(!root.join("reef-job1-app_001").exists());
    }

    #[tokio::test]
    async fn fallo_de_asignacion_no_crea_nada() {
        let root = temp_dir("asignacion");
        let rm = FakeRm::default();
        rm.state.lock().unwrap().fail_allocation = true;
        let uploader = FakeUploader::default();
        let s = submitter(&rm, &uploader, &root);

        let err = s.submit(&job("job1")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Allocation);
        assert_eq!(fs::read_dir(&root).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn id_de_aplicacion_con_guiones_es_rechazado() {
        let root = temp_dir("id_invalido");
        let rm = FakeRm::with_fixed_id("app-001");
        let uploader = FakeUploader::default();
        let s = submitter(&rm, &uploader, &root);

        let err = s.submit(&job("job1")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Allocation);
        assert_eq!(fs::read_dir(&root).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn fallo_de_subida_deja_la_aplicacion_sin_enviar() {
        let root = temp_dir("subida");
        let rm = FakeRm::with_fixed_id("app_001");
        let uploader = FakeUploader {
            fail: true,
            ..Default::default()
        };
        let s = submitter(&rm, &uploader, &root);

        let err = s.submit(&job("job1")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Upload);
        assert!(matches!(err, SubmitError::Upload { ref application_id, .. } if application_id == "app_001"));
        assert_eq!(rm.calls(), vec!["new_application"]);
        // la carpeta queda para inspección
        assert!(root
            .join("reef-job1-app_001/reef/local/job-submission-params.json")
            .is_file());
    }

    #[tokio::test]
    async fn rechazo_del_rm_es_error_de_envio() {
        let root = temp_dir("rechazo");
        let rm = FakeRm::with_fixed_id("app_001");
        rm.state.lock().unwrap().fail_submit = true;
        let uploader = FakeUploader::default();
        let s = submitter(&rm, &uploader, &root);

        let err = s.submit(&job("job1")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Submission);
        assert_eq!(rm.calls(), vec!["new_application", "submit_application"]);
    }

    #[tokio::test]
    async fn archivo_del_job_inexistente_es_error_de_staging() {
        let root = temp_dir("staging");
        let rm = FakeRm::with_fixed_id("app_001");
        let uploader = FakeUploader::default();
        let s = submitter(&rm, &uploader, &root);

        let job = JobSubmission::builder()
            .job_identifier("job1")
            .add_driver_configuration(scenario_config())
            .add_global_file(root.join("no-existe.jar"))
            .build()
            .unwrap();

        let err = s.submit(&job).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Staging);
        assert!(uploader.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn archivo_local_con_nombre_de_parametros_es_error_de_staging() {
        let root = temp_dir("nombre_parametros");
        let inputs = root.join("in");
        fs::create_dir_all(&inputs).unwrap();
        fs::write(inputs.join("job-submission-params.json"), b"{}").unwrap();

        let rm = FakeRm::with_fixed_id("app_001");
        let uploader = FakeUploader::default();
        let s = submitter(&rm, &uploader, &root);

        let job = JobSubmission::builder()
            .job_identifier("job1")
            .add_driver_configuration(scenario_config())
            .add_local_file(inputs.join("job-submission-params.json"))
            .build()
            .unwrap();

        let err = s.submit(&job).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Staging);
        assert!(matches!(err, SubmitError::Staging(StageError::ReservedName(_))));
        assert!(uploader.calls.lock().unwrap().is_empty());
        assert_eq!(rm.calls(), vec!["new_application"]);
    }

    #[tokio::test]
    async fn driver_conf_del_usuario_no_se_pisa_en_silencio() {
        let root = temp_dir("driver_conf_usuario");
        let inputs = root.join("in");
        fs::create_dir_all(&inputs).unwrap();
        fs::write(inputs.join("driver.conf"), b"conf del usuario").unwrap();

        let rm = FakeRm::with_fixed_id("app_001");
        let uploader = FakeUploader::default();
        let s = submitter(&rm, &uploader, &root);

        let job = JobSubmission::builder()
            .job_identifier("job1")
            .add_driver_configuration(scenario_config())
            .add_local_file(inputs.join("driver.conf"))
            .build()
            .unwrap();

        let err = s.submit(&job).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Staging);
        assert!(rm.submitted().is_empty());
        assert!(uploader.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn estado_con_id_que_sale_de_la_ruta_es_rechazado() {
        let root = temp_dir("estado_ruta");
        let rm = FakeRm::default();
        let uploader = FakeUploader::default();
        let s = submitter(&rm, &uploader, &root);

        let err = s
            .get_job_final_status("x/../new-application")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StatusQuery);
        assert!(matches!(
            err,
            SubmitError::StatusQuery { source: RmError::InvalidApplicationId(_), .. }
        ));
        assert!(rm.calls().is_empty());
    }

    #[tokio::test]
    async fn estado_final_es_una_lectura_pura() {
        let root = temp_dir("estado");
        let rm = FakeRm::with_fixed_id("app_001");
        let uploader = FakeUploader::default();
        let s = submitter(&rm, &uploader, &root);

        let app_id = s.submit(&job("job1")).await.unwrap();

        let first = s.get_job_final_status(&app_id).await.unwrap();
        let second = s.get_job_final_status(&app_id).await.unwrap();
        assert_eq!(first, FinalState::Undefined);
        assert_eq!(first, second);
        assert_eq!(rm.submitted().len(), 1);
    }

    #[tokio::test]
    async fn estado_de_aplicacion_desconocida_es_error() {
        let root = temp_dir("desconocida");
        let rm = FakeRm::default();
        let uploader = FakeUploader::default();
        let s = submitter(&rm, &uploader, &root);

        let err = s.get_job_final_status("unknown_app").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StatusQuery);
        assert!(matches!(
            err,
            SubmitError::StatusQuery { source: RmError::UnknownApplication(_), .. }
        ));
    }

    #[tokio::test]
    async fn envios_concurrentes_no_se_pisan() {
        let root = temp_dir("concurrentes");
        let rm = FakeRm::default();
        let uploader = FakeUploader::default();
        let s = submitter(&rm, &uploader, &root);

        let job_a = job("job1");
        let job_b = job("job1");
        let (a, b) = tokio::join!(s.submit(&job_a), s.submit(&job_b));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_ne!(a, b);
        assert!(root.join(format!("reef-job1-{a}")).is_dir());
        assert!(root.join(format!("reef-job1-{b}")).is_dir());
        assert_eq!(rm.submitted().len(), 2);
        assert_eq!(s.counters().value(SUBMISSIONS_COUNTER), Some(2));
    }
}
