use std::fmt;
use sysinfo::{CpuExt, Pid, ProcessExt, System, SystemExt};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MachineStatusError {
    #[error("no se pudo obtener el pid actual: {0}")]
    Pid(String),

    #[error("el proceso {0} no aparece en la tabla de procesos")]
    ProcessNotFound(String),
}

/// Foto del estado de la máquina y del proceso actual.
#[derive(Debug, Clone, PartialEq)]
pub struct MachineStatus {
    pub hostname: String,
    pub node_cpu_percent: f32,
    pub available_memory_mb: u64,
    pub process_cpu_percent: f32,
    pub process_memory_mb: u64,
}

impl fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "el nodo {} está al [{:.1}%] de CPU con [{}MB] de memoria disponible; \
             el proceso usa [{:.1}%] de CPU y [{}MB] de memoria",
            self.hostname,
            self.node_cpu_percent,
            self.available_memory_mb,
            self.process_cpu_percent,
            self.process_memory_mb
        )
    }
}

/// Sensor de solo lectura. Se inyecta donde haga falta; no hay estado global.
pub trait MachineStatusSensor {
    fn sample(&mut self) -> Result<MachineStatus, MachineStatusError>;
}

/// Sensor basado en sysinfo.
/// Si falla una vez se apaga para siempre y solo informa el error.
pub struct SysinfoSensor {
    sys: System,
    hostname: String,
    disabled: Option<String>,
}

impl SysinfoSensor {
    pub fn new() -> Self {
        let hostname = hostname::get()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        Self {
            sys: System::new(),
            hostname,
            disabled: None,
        }
    }

    /// Texto para logs; nunca falla.
    pub fn report(&mut self) -> String {
        if let Some(reason) = &self.disabled {
            return format!("no hay información de la máquina: {reason}");
        }

        match self.sample() {
            Ok(status) => status.to_string(),
            Err(e) => {
                warn!("no se pudo obtener el estado de la máquina: {}", e);
                let text = format!("no se pudo obtener el estado de la máquina: {e}");
                self.disabled = Some(e.to_string());
                text
            }
        }
    }
}

impl Default for SysinfoSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl MachineStatusSensor for SysinfoSensor {
    fn sample(&mut self) -> Result<MachineStatus, MachineStatusError> {
        let pid: Pid =
            sysinfo::get_current_pid().map_err(|e| MachineStatusError::Pid(e.to_string()))?;

        self.sys.refresh_cpu();
        self.sys.refresh_memory();
        if !self.sys.refresh_process(pid) {
            return Err(MachineStatusError::ProcessNotFound(pid.to_string()));
        }

        let process = self
            .sys
            .process(pid)
            .ok_or_else(|| MachineStatusError::ProcessNotFound(pid.to_string()))?;

        Ok(MachineStatus {
            hostname: self.hostname.clone(),
            node_cpu_percent: self.sys.global_cpu_info().cpu_usage(),
            // sysinfo devuelve bytes
            available_memory_mb: self.sys.available_memory() / 1_000_000,
            process_cpu_percent: process.cpu_usage(),
            process_memory_mb: process.memory() / 1_000_000,
        })
    }
}
