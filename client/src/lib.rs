//! Cliente de envío de jobs REEF contra la API REST de YARN.

pub mod command;
pub mod config;
pub mod error;
pub mod request;
pub mod rm;
pub mod stager;
pub mod submitter;
pub mod uploader;

pub use command::{JobCommandProvider, YarnJobCommandProvider};
pub use config::{ClientConfig, ClientConfigError, Profile};
pub use error::{ErrorKind, SubmitError};
pub use rm::{Credentials, ResourceManager, RmError, YarnRestClient};
pub use stager::StageError;
pub use submitter::JobSubmitter;
pub use uploader::{FileSystemJobResourceUploader, JobResource, JobResourceUploader, UploadError};
