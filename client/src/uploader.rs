use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::files::{JOB_RESOURCE_ARCHIVE, REEF_FOLDER};
use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};
use tar::Builder;
use thiserror::Error;
use tracing::info;
use walkdir::WalkDir;

/// Handle del recurso ya subido. Solo lo consume el armado del descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResource {
    pub remote_upload_path: String,
    pub resource_size: u64,
    /// Milisegundos Unix
    pub last_modification_unix_timestamp: i64,
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("error de E/S subiendo {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("la carpeta a subir no tiene {0}")]
    MissingReefFolder(PathBuf),

    #[error("la subida terminó inesperadamente: {0}")]
    Interrupted(String),
}

impl UploadError {
    fn io(path: &Path, source: io::Error) -> Self {
        UploadError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Directorio remoto del envío: `<prefix>/<applicationId>/`.
/// Función pura del prefijo y del id, se puede recalcular cuantas veces haga falta.
pub fn job_submission_remote_directory(prefix: &str, application_id: &str) -> String {
    format!("{}/{}/", prefix.trim_end_matches('/'), application_id)
}

/// Sube una carpeta de staging ya preparada al almacenamiento remoto.
/// Solo devuelve el handle cuando el recurso remoto está completo.
#[async_trait]
pub trait JobResourceUploader: Send + Sync {
    async fn upload_job_resource(
        &self,
        local_folder: &Path,
        remote_directory: &str,
    ) -> Result<JobResource, UploadError>;
}

/// Uploader contra un filesystem remoto montado localmente (NFS, DFS fuse, ...).
/// Empaqueta `reef/` en un tar, lo escribe con nombre temporal y lo renombra al final.
#[derive(Debug, Clone)]
pub struct FileSystemJobResourceUploader {
    mount_root: PathBuf,
    uri_prefix: String,
}

impl FileSystemJobResourceUploader {
    /// `mount_root`: donde está montado el filesystem remoto.
    /// `uri_prefix`: cómo lo ve el RM, ej. "hdfs://namenode:8020" (vacío = ruta tal cual).
    pub fn new(mount_root: impl Into<PathBuf>, uri_prefix: impl Into<String>) -> Self {
        Self {
            mount_root: mount_root.into(),
            uri_prefix: uri_prefix.into(),
        }
    }

    fn upload_blocking(
        &self,
        local_folder: &Path,
        remote_directory: &str,
    ) -> Result<JobResource, UploadError> {
        let reef = local_folder.join(REEF_FOLDER);
        if !reef.is_dir() {
            return Err(UploadError::MissingReefFolder(local_folder.to_path_buf()));
        }

        let dest_dir = self.mount_root.join(remote_directory.trim_start_matches('/'));
        fs::create_dir_all(&dest_dir).map_err(|e| UploadError::io(&dest_dir, e))?;

        let final_path = dest_dir.join(JOB_RESOURCE_ARCHIVE);
        let tmp_path = dest_dir.join(format!(".{}.tmp", JOB_RESOURCE_ARCHIVE));

        let placed = write_archive(&reef, &tmp_path).and_then(|_| {
            fs::rename(&tmp_path, &final_path).map_err(|e| UploadError::io(&final_path, e))
        });
        if let Err(e) = placed {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        let metadata = fs::metadata(&final_path).map_err(|e| UploadError::io(&final_path, e))?;
        let modified = metadata
            .modified()
            .map_err(|e| UploadError::io(&final_path, e))?;

        let remote_path = format!(
            "{}/{}",
            remote_directory.trim_end_matches('/'),
            JOB_RESOURCE_ARCHIVE
        );

        Ok(JobResource {
            remote_upload_path: format!("{}{}", self.uri_prefix.trim_end_matches('/'), remote_path),
            resource_size: metadata.len(),
            last_modification_unix_timestamp: DateTime::<Utc>::from(modified).timestamp_millis(),
        })
    }
}

/// Tar con el contenido de `reef/` en la raíz (YARN lo desempaqueta como `reef/`).
fn write_archive(reef: &Path, archive_path: &Path) -> Result<(), UploadError> {
    let file = File::create(archive_path).map_err(|e| UploadError::io(archive_path, e))?;
    let mut builder = Builder::new(file);

    for entry in WalkDir::new(reef).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(reef).to_path_buf();
            UploadError::Io {
                path,
                source: e.into(),
            }
        })?;

        let rel = match entry.path().strip_prefix(reef) {
            Ok(rel) if !rel.as_os_str().is_empty() => rel,
            _ => continue,
        };

        if entry.file_type().is_dir() {
            builder
                .append_dir(rel, entry.path())
                .map_err(|e| UploadError::io(entry.path(), e))?;
        } else {
            builder
                .append_path_with_name(entry.path(), rel)
                .map_err(|e| UploadError::io(entry.path(), e))?;
        }
    }

    let file = builder
        .into_inner()
        .map_err(|e| UploadError::io(archive_path, e))?;
    file.sync_all().map_err(|e| UploadError::io(archive_path, e))?;
    Ok(())
}

#[async_trait]
impl JobResourceUploader for FileSystemJobResourceUploader {
    async fn upload_job_resource(
        &self,
        local_folder: &Path,
        remote_directory: &str,
    ) -> Result<JobResource, UploadError> {
        let this = self.clone();
        let local = local_folder.to_path_buf();
        let remote = remote_directory.to_string();

        let resource = tokio::task::spawn_blocking(move || this.upload_blocking(&local, &remote))
            .await
            .map_err(|e| UploadError::Interrupted(e.to_string()))??;

        info!(
            "recurso del job subido a {} ({} bytes)",
            resource.remote_upload_path, resource.resource_size
        );
        Ok(resource)
    }
}
