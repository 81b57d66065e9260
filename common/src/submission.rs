use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigurationFragment;

pub type JobId = String;

/// Memoria por defecto del driver (MB) si el job no dice nada.
pub const DEFAULT_DRIVER_MEMORY_MB: u32 = 512;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JobSubmissionError {
    #[error("el identificador del job está vacío")]
    EmptyJobId,

    #[error("identificador de job inválido '{0}': no puede contener separadores de ruta")]
    InvalidJobId(String),

    #[error("la memoria del driver tiene que ser positiva")]
    ZeroDriverMemory,
}

/// Todo lo que el cliente necesita para enviar un job.
/// Se construye con `JobSubmissionBuilder` y no cambia durante el envío.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSubmission {
    job_identifier: JobId,
    driver_memory_mb: u32,
    driver_configurations: Vec<ConfigurationFragment>,

    /// Archivos que van a reef/global (compartidos con los evaluators)
    global_files: Vec<PathBuf>,
    /// Archivos que van a reef/local (solo el driver)
    local_files: Vec<PathBuf>,
}

impl JobSubmission {
    pub fn builder() -> JobSubmissionBuilder {
        JobSubmissionBuilder::default()
    }

    pub fn job_identifier(&self) -> &str {
        &self.job_identifier
    }

    pub fn driver_memory_mb(&self) -> u32 {
        self.driver_memory_mb
    }

    pub fn driver_configurations(&self) -> &[ConfigurationFragment] {
        &self.driver_configurations
    }

    pub fn global_files(&self) -> &[PathBuf] {
        &self.global_files
    }

    pub fn local_files(&self) -> &[PathBuf] {
        &self.local_files
    }
}

#[derive(Debug, Clone, Default)]
pub struct JobSubmissionBuilder {
    job_identifier: Option<JobId>,
    driver_memory_mb: Option<u32>,
    driver_configurations: Vec<ConfigurationFragment>,
    global_files: Vec<PathBuf>,
    local_files: Vec<PathBuf>,
}

impl JobSubmissionBuilder {
    pub fn job_identifier(mut self, id: impl Into<String>) -> Self {
        self.job_identifier = Some(id.into());
        self
    }

    pub fn driver_memory_mb(mut self, mb: u32) -> Self {
        self.driver_memory_mb = Some(mb);
        self
    }

    pub fn add_driver_configuration(mut self, fragment: ConfigurationFragment) -> Self {
        self.driver_configurations.push(fragment);
        self
    }

    pub fn add_global_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.global_files.push(path.into());
        self
    }

    pub fn add_local_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_files.push(path.into());
        self
    }

    pub fn build(self) -> Result<JobSubmission, JobSubmissionError> {
        let job_identifier = self.job_identifier.unwrap_or_default();
        if job_identifier.trim().is_empty() {
            return Err(JobSubmissionError::EmptyJobId);
        }
        // el id termina en el nombre de la carpeta de staging
        if job_identifier.contains(['/', '\\']) || job_identifier == "." || job_identifier == ".." {
            return Err(JobSubmissionError::InvalidJobId(job_identifier));
        }

        let driver_memory_mb = self.driver_memory_mb.unwrap_or(DEFAULT_DRIVER_MEMORY_MB);
        if driver_memory_mb == 0 {
            return Err(JobSubmissionError::ZeroDriverMemory);
        }

        Ok(JobSubmission {
            job_identifier,
            driver_memory_mb,
            driver_configurations: self.driver_configurations,
            global_files: self.global_files,
            local_files: self.local_files,
        })
    }
}
