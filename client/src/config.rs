//! Perfiles del cliente: a qué RM hablar, dónde subir y cómo lanzar el driver.
//!
//! Se leen de un TOML (`--config` o REEF_CLIENT_CONFIG). Sin archivo se usa el
//! perfil `yarnrest` por defecto; la variable RM_URL pisa la URL del RM.
//!
//! ```toml
//! [profiles.hdi]
//! rm_url = "https://cluster.example.net/"
//! rm_user = "reef"
//! rm_password = "..."
//! remote_root = "/mnt/dfs"
//! remote_uri_prefix = "wasb://reef@cuenta.blob.core.windows.net"
//!
//! [profiles.hdi.driver_defaults]
//! MaxApplicationSubmissions = "3"
//! ```

use common::config::{
    DRIVER_RESTART_EVALUATOR_RECOVERY_SECONDS, MAX_APPLICATION_SUBMISSIONS, TCP_PORT_RANGE_COUNT,
    TCP_PORT_RANGE_START, TCP_PORT_RANGE_TRY_COUNT,
};
use common::ConfigurationFragment;
use serde::Deserialize;
use std::{
    collections::BTreeMap,
    env, fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

use crate::command::{YarnJobCommandProvider, DEFAULT_JAVA_PATH, DEFAULT_LAUNCHER_CLASS};
use crate::rm::Credentials;

pub const DEFAULT_PROFILE: &str = "yarnrest";
pub const CONFIG_PATH_ENV: &str = "REEF_CLIENT_CONFIG";
pub const RM_URL_ENV: &str = "RM_URL";

#[derive(Debug, Error)]
pub enum ClientConfigError {
    #[error("no se pudo leer {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("TOML inválido en {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("perfil desconocido: {0}")]
    UnknownProfile(String),
}

/// Valores de la configuración del driver que se usan si nadie dice otra cosa
pub fn builtin_driver_defaults() -> BTreeMap<String, String> {
    [
        (TCP_PORT_RANGE_START.name, "8900"),
        (TCP_PORT_RANGE_COUNT.name, "1000"),
        (TCP_PORT_RANGE_TRY_COUNT.name, "1000"),
        (MAX_APPLICATION_SUBMISSIONS.name, "1"),
        (DRIVER_RESTART_EVALUATOR_RECOVERY_SECONDS.name, "180"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Profile {
    pub rm_url: String,
    pub rm_user: Option<String>,
    pub rm_password: Option<String>,

    /// Punto de montaje local del filesystem remoto
    pub remote_root: PathBuf,
    /// Prefijo con el que el RM ve ese filesystem (hdfs://..., file://...)
    pub remote_uri_prefix: String,
    pub job_submission_directory_prefix: String,
    /// None = directorio temporal del sistema
    pub staging_root: Option<PathBuf>,

    pub java_path: String,
    pub launcher_class: String,
    pub driver_max_heap_mb: Option<u32>,
    pub extra_classpath: Vec<String>,

    /// Se aplican encima de `builtin_driver_defaults`
    pub driver_defaults: BTreeMap<String, String>,
}

impl Default for Profile {
    fn default() -> Self {
        let remote_root = env::temp_dir().join("reef-dfs");
        let remote_uri_prefix = format!("file://{}", remote_root.display());

        Self {
            rm_url: "http://localhost:8088".to_string(),
            rm_user: None,
            rm_password: None,
            remote_root,
            remote_uri_prefix,
            job_submission_directory_prefix: "/vol1/tmp".to_string(),
            staging_root: None,
            java_path: DEFAULT_JAVA_PATH.to_string(),
            launcher_class: DEFAULT_LAUNCHER_CLASS.to_string(),
            driver_max_heap_mb: None,
            extra_classpath: Vec::new(),
            driver_defaults: BTreeMap::new(),
        }
    }
}

impl Profile {
    pub fn staging_root(&self) -> PathBuf {
        self.staging_root.clone().unwrap_or_else(env::temp_dir)
    }

    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.rm_user, &self.rm_password) {
            (Some(user), Some(password)) => Some(Credentials {
                user: user.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }

    pub fn command_provider(&self) -> YarnJobCommandProvider {
        YarnJobCommandProvider {
            java_path: self.java_path.clone(),
            launcher_class: self.launcher_class.clone(),
            driver_max_heap_mb: self.driver_max_heap_mb,
            extra_classpath: self.extra_classpath.clone(),
        }
    }

    /// Un solo fragmento: defaults, luego los del perfil, luego `overrides`.
    pub fn driver_configuration(&self, overrides: &[(String, String)]) -> ConfigurationFragment {
        let mut bindings = builtin_driver_defaults();
        bindings.extend(self.driver_defaults.clone());
        bindings.extend(overrides.iter().cloned());
        bindings.into_iter().collect()
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = env::var(RM_URL_ENV) {
            if !url.trim().is_empty() {
                self.rm_url = url;
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl ClientConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// `path` explícito, si no REEF_CLIENT_CONFIG, si no la configuración vacía.
    pub fn load(path: Option<&Path>) -> Result<Self, ClientConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));

        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = fs::read_to_string(&path).map_err(|e| ClientConfigError::Read {
            path: path.clone(),
            source: e,
        })?;
        Self::from_toml_str(&raw).map_err(|e| ClientConfigError::Parse { path, source: e })
    }

    pub fn profile(&self, name: &str) -> Result<Profile, ClientConfigError> {
        match self.profiles.get(name) {
            Some(profile) => Ok(profile.clone()),
            None if name == DEFAULT_PROFILE => Ok(Profile::default()),
            None => Err(ClientConfigError::UnknownProfile(name.to_string())),
        }
    }
}
