use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errores al resolver la configuración del driver.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("falta el parámetro requerido {name}")]
    Missing { name: &'static str },

    #[error("valor inválido para {name}: '{value}' ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("el parámetro {key} está definido dos veces: '{first}' y '{second}'")]
    Conflict {
        key: String,
        first: String,
        second: String,
    },
}

/// Fragmento de configuración del driver: bindings clave -> valor.
/// Un job puede traer varios; se mezclan antes de resolver los parámetros.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigurationFragment {
    bindings: BTreeMap<String, String>,
}

impl ConfigurationFragment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.bindings.insert(key.into(), value.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.bindings.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Mezcla varios fragmentos en uno solo.
    /// La misma clave con dos valores distintos es un error; repetir el mismo valor no.
    pub fn merge(fragments: &[ConfigurationFragment]) -> Result<ConfigurationFragment, ConfigError> {
        let mut merged: BTreeMap<String, String> = BTreeMap::new();

        for fragment in fragments {
            for (key, value) in &fragment.bindings {
                match merged.get(key) {
                    Some(existing) if existing != value => {
                        return Err(ConfigError::Conflict {
                            key: key.clone(),
                            first: existing.clone(),
                            second: value.clone(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        merged.insert(key.clone(), value.clone());
                    }
                }
            }
        }

        Ok(ConfigurationFragment { bindings: merged })
    }
}

impl FromIterator<(String, String)> for ConfigurationFragment {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            bindings: iter.into_iter().collect(),
        }
    }
}

/// Parámetro con nombre y su dominio numérico declarado (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamedParameter {
    pub name: &'static str,
    pub min: u32,
    pub max: u32,
}

pub const TCP_PORT_RANGE_START: NamedParameter = NamedParameter {
    name: "TcpPortRangeStart",
    min: 1,
    max: 65535,
};

pub const TCP_PORT_RANGE_COUNT: NamedParameter = NamedParameter {
    name: "TcpPortRangeCount",
    min: 1,
    max: 65535,
};

pub const TCP_PORT_RANGE_TRY_COUNT: NamedParameter = NamedParameter {
    name: "TcpPortRangeTryCount",
    min: 1,
    max: u32::MAX,
};

pub const MAX_APPLICATION_SUBMISSIONS: NamedParameter = NamedParameter {
    name: "MaxApplicationSubmissions",
    min: 1,
    max: u32::MAX,
};

pub const DRIVER_RESTART_EVALUATOR_RECOVERY_SECONDS: NamedParameter = NamedParameter {
    name: "DriverRestartEvaluatorRecoverySeconds",
    min: 0,
    max: u32::MAX,
};

impl NamedParameter {
    pub fn resolve(&self, config: &ConfigurationFragment) -> Result<u32, ConfigError> {
        let raw = config
            .get(self.name)
            .ok_or(ConfigError::Missing { name: self.name })?;

        let invalid = |reason: String| ConfigError::Invalid {
            name: self.name,
            value: raw.to_string(),
            reason,
        };

        // i64 para poder reportar negativos como fuera de rango y no como basura
        let parsed: i64 = raw
            .trim()
            .parse()
            .map_err(|e| invalid(format!("no es un entero: {e}")))?;

        if parsed < i64::from(self.min) || parsed > i64::from(self.max) {
            return Err(invalid(format!(
                "fuera del rango [{}, {}]",
                self.min, self.max
            )));
        }

        Ok(parsed as u32)
    }
}

/// Valores escalares que el cliente necesita de la configuración del driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverParameters {
    pub tcp_begin_port: u32,
    pub tcp_range_count: u32,
    pub tcp_try_count: u32,
    pub max_application_submissions: u32,
    pub driver_recovery_timeout_secs: u32,
}

impl DriverParameters {
    pub fn resolve(fragments: &[ConfigurationFragment]) -> Result<Self, ConfigError> {
        let config = ConfigurationFragment::merge(fragments)?;

        let tcp_begin_port = TCP_PORT_RANGE_START.resolve(&config)?;
        let tcp_range_count = TCP_PORT_RANGE_COUNT.resolve(&config)?;

        // el rango completo tiene que caber en el espacio de puertos
        if u64::from(tcp_begin_port) + u64::from(tcp_range_count) - 1 > 65535 {
            return Err(ConfigError::Invalid {
                name: TCP_PORT_RANGE_COUNT.name,
                value: tcp_range_count.to_string(),
                reason: format!("el rango desde {tcp_begin_port} se sale de 65535"),
            });
        }

        Ok(Self {
            tcp_begin_port,
            tcp_range_count,
            tcp_try_count: TCP_PORT_RANGE_TRY_COUNT.resolve(&config)?,
            max_application_submissions: MAX_APPLICATION_SUBMISSIONS.resolve(&config)?,
            driver_recovery_timeout_secs: DRIVER_RESTART_EVALUATOR_RECOVERY_SECONDS
                .resolve(&config)?,
        })
    }
}
