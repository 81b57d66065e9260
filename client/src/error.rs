use common::{ApplicationId, ConfigError};
use std::path::PathBuf;
use thiserror::Error;

use crate::rm::RmError;
use crate::stager::StageError;
use crate::uploader::UploadError;

/// Tipo de falla de un envío, para quien necesite distinguirlas sin mirar el detalle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Allocation,
    StagingCollision,
    Staging,
    Configuration,
    Upload,
    Submission,
    StatusQuery,
}

/// Errores de `JobSubmitter`. Ninguno se reintenta en esta capa.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("el resource manager no pudo asignar un id de aplicación: {0}")]
    Allocation(#[source] RmError),

    #[error("la carpeta de staging ya está en uso: {path}")]
    StagingCollision { path: PathBuf },

    #[error("no se pudo preparar la carpeta de staging: {0}")]
    Staging(#[source] StageError),

    #[error("configuración del job inválida: {0}")]
    Configuration(#[from] ConfigError),

    /// La aplicación queda asignada en el RM pero sin enviar
    #[error("falló la subida de recursos de la aplicación {application_id}: {source}")]
    Upload {
        application_id: ApplicationId,
        #[source]
        source: UploadError,
    },

    #[error("el resource manager rechazó la aplicación {application_id}: {source}")]
    Submission {
        application_id: ApplicationId,
        #[source]
        source: RmError,
    },

    #[error("no se pudo consultar la aplicación {application_id}: {source}")]
    StatusQuery {
        application_id: ApplicationId,
        #[source]
        source: RmError,
    },
}

impl SubmitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SubmitError::Allocation(_) => ErrorKind::Allocation,
            SubmitError::StagingCollision { .. } => ErrorKind::StagingCollision,
            SubmitError::Staging(_) => ErrorKind::Staging,
            SubmitError::Configuration(_) => ErrorKind::Configuration,
            SubmitError::Upload { .. } => ErrorKind::Upload,
            SubmitError::Submission { .. } => ErrorKind::Submission,
            SubmitError::StatusQuery { .. } => ErrorKind::StatusQuery,
        }
    }
}

impl From<StageError> for SubmitError {
    fn from(err: StageError) -> Self {
        match err {
            StageError::FolderExists(path) | StageError::ParametersExist(path) => {
                SubmitError::StagingCollision { path }
            }
            StageError::Configuration(e) => SubmitError::Configuration(e),
            other => SubmitError::Staging(other),
        }
    }
}
