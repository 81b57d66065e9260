pub mod config;
pub mod files;
pub mod machine;
pub mod params;
pub mod submission;
pub mod telemetry;
pub mod yarn;

pub use config::{ConfigError, ConfigurationFragment, DriverParameters, NamedParameter};
pub use machine::{MachineStatus, MachineStatusError, MachineStatusSensor, SysinfoSensor};
pub use params::{JobSubmissionParameters, YarnJobSubmissionParameters};
pub use submission::{JobId, JobSubmission, JobSubmissionBuilder, JobSubmissionError};
pub use telemetry::{Counter, Counters, CountersData};
pub use yarn::{
    AmContainerSpec, Application, ApplicationId, ApplicationResponse, ApplicationState, Commands,
    FinalState, LocalResource, LocalResourceEntry, LocalResources, NewApplication, Resource,
    ResourceType, SubmitApplication, Visibility,
};
