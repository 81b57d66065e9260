use serde::{Deserialize, Serialize};

use crate::config::DriverParameters;
use crate::submission::JobId;

/// Parámetros comunes a cualquier runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSubmissionParameters {
    pub job_id: JobId,
    pub tcp_begin_port: u32,
    pub tcp_range_count: u32,
    pub tcp_try_count: u32,
    /// Carpeta local de staging donde se preparó el job
    pub job_submission_folder: String,
}

/// Descriptor que viaja dentro del archivo subido (reef/local/job-submission-params.json).
/// El launcher del lado remoto lo lee con este mismo esquema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YarnJobSubmissionParameters {
    pub driver_memory: u32,
    /// Segundos que espera el driver a los evaluators tras un reinicio
    pub driver_recovery_timeout: u32,
    pub job_submission_directory_prefix: String,
    pub dfs_job_submission_folder: String,
    pub shared_job_submission_parameters: JobSubmissionParameters,
}

impl YarnJobSubmissionParameters {
    pub fn new(
        job_id: &str,
        driver_memory_mb: u32,
        driver: &DriverParameters,
        local_folder: &str,
        remote_directory: &str,
    ) -> Self {
        Self {
            driver_memory: driver_memory_mb,
            driver_recovery_timeout: driver.driver_recovery_timeout_secs,
            job_submission_directory_prefix: remote_directory.to_string(),
            dfs_job_submission_folder: remote_directory.to_string(),
            shared_job_submission_parameters: JobSubmissionParameters {
                job_id: job_id.to_string(),
                tcp_begin_port: driver.tcp_begin_port,
                tcp_range_count: driver.tcp_range_count,
                tcp_try_count: driver.tcp_try_count,
                job_submission_folder: local_folder.to_string(),
            },
        }
    }

    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }

    pub fn from_json_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}
