//! Nombres de archivos y carpetas que comparten el cliente y el lado remoto.

use std::path::PathBuf;

/// Prefijo de las carpetas de staging: `reef-<jobId>-<applicationId>`
pub const STAGING_FOLDER_PREFIX: &str = "reef";

pub const REEF_FOLDER: &str = "reef";
pub const LOCAL_FOLDER: &str = "local";
pub const GLOBAL_FOLDER: &str = "global";

pub const JOB_SUBMISSION_PARAMETERS_FILE: &str = "job-submission-params.json";
pub const DRIVER_CONFIGURATION_FILE: &str = "driver.conf";

/// Archivo que se sube al almacenamiento remoto
pub const JOB_RESOURCE_ARCHIVE: &str = "job-submission.tar";

/// reef/local
pub fn local_folder_path() -> PathBuf {
    PathBuf::from(REEF_FOLDER).join(LOCAL_FOLDER)
}

/// reef/global
pub fn global_folder_path() -> PathBuf {
    PathBuf::from(REEF_FOLDER).join(GLOBAL_FOLDER)
}

/// reef/local/job-submission-params.json
pub fn job_submission_parameters_path() -> PathBuf {
    local_folder_path().join(JOB_SUBMISSION_PARAMETERS_FILE)
}

/// Misma ruta pero como la ve el contenedor (siempre con '/')
pub fn job_submission_parameters_container_path() -> String {
    format!("{REEF_FOLDER}/{LOCAL_FOLDER}/{JOB_SUBMISSION_PARAMETERS_FILE}")
}

pub fn staging_folder_name(job_id: &str, application_id: &str) -> String {
    [STAGING_FOLDER_PREFIX, job_id, application_id].join("-")
}
