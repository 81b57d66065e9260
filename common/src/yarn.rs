//! Tipos del API REST del resource manager (YARN).
//! Los nombres de campo en el JSON tienen que coincidir exactamente con lo que espera el RM.

use serde::{Deserialize, Serialize};

pub type ApplicationId = String;

/// Tipo de aplicación con el que nos identificamos ante el RM
pub const APPLICATION_TYPE: &str = "REEF";
pub const DEFAULT_QUEUE: &str = "default";
pub const DEFAULT_PRIORITY: i32 = 1;
pub const AM_VCORES: u32 = 1;

/// Clave del único recurso local del contenedor del AM.
/// YARN desempaqueta el archivo en una carpeta con este nombre.
pub const JOB_RESOURCE_KEY: &str = "reef";

/// Respuesta de POST /ws/v1/cluster/apps/new-application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NewApplication {
    pub application_id: ApplicationId,
    #[serde(default)]
    pub maximum_resource_capability: Option<Resource>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "memory")]
    pub memory_mb: u32,
    #[serde(rename = "vCores")]
    pub vcores: u32,
}

/// Cuerpo de POST /ws/v1/cluster/apps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SubmitApplication {
    pub application_id: ApplicationId,
    pub application_name: String,
    pub queue: String,
    pub priority: i32,
    pub am_container_spec: AmContainerSpec,
    #[serde(rename = "unmanaged-AM")]
    pub unmanaged_am: bool,
    pub max_app_attempts: u32,
    #[serde(rename = "resource")]
    pub am_resource: Resource,
    pub application_type: String,
    pub keep_containers_across_application_attempts: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AmContainerSpec {
    pub local_resources: LocalResources,
    pub commands: Commands,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalResources {
    #[serde(rename = "entry")]
    pub entries: Vec<LocalResourceEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalResourceEntry {
    pub key: String,
    pub value: LocalResource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalResource {
    pub resource: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub visibility: Visibility,
    pub size: u64,
    /// Última modificación en milisegundos Unix; YARN la compara al localizar
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceType {
    Archive,
    File,
    Pattern,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Visibility {
    Public,
    Private,
    Application,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commands {
    pub command: String,
}

/// Respuesta de GET /ws/v1/cluster/apps/{id}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationResponse {
    pub app: Application,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: ApplicationId,
    #[serde(default)]
    pub name: String,
    pub state: ApplicationState,
    pub final_status: FinalState,
    #[serde(default)]
    pub progress: f32,
    #[serde(default)]
    pub queue: Option<String>,
    #[serde(default)]
    pub application_type: Option<String>,
    #[serde(default)]
    pub tracking_url: Option<String>,
    #[serde(default)]
    pub diagnostics: Option<String>,
}

/// Ciclo de vida de una aplicación según el RM. Solo lo observamos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationState {
    New,
    NewSaving,
    Submitted,
    Accepted,
    Running,
    Finished,
    Failed,
    Killed,
}

impl ApplicationState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::Killed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinalState {
    Undefined,
    Succeeded,
    Failed,
    Killed,
}
