use common::files::{job_submission_parameters_container_path, GLOBAL_FOLDER, LOCAL_FOLDER, REEF_FOLDER};

/// Comando con el que YARN lanza el contenedor del AM.
pub trait JobCommandProvider: Send + Sync {
    fn job_submission_command(&self) -> String;
}

pub const DEFAULT_JAVA_PATH: &str = "{{JAVA_HOME}}/bin/java";
pub const DEFAULT_LAUNCHER_CLASS: &str = "org.apache.reef.bridge.client.YarnBootstrapREEFLauncher";

/// Separador de classpath multiplataforma; YARN lo expande en el nodo
const CLASSPATH_SEPARATOR: &str = "<CPS>";
const LOG_DIR: &str = "<LOG_DIR>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YarnJobCommandProvider {
    pub java_path: String,
    pub launcher_class: String,
    pub driver_max_heap_mb: Option<u32>,
    /// Entradas extra del classpath de YARN en el cluster
    pub extra_classpath: Vec<String>,
}

impl Default for YarnJobCommandProvider {
    fn default() -> Self {
        Self {
            java_path: DEFAULT_JAVA_PATH.to_string(),
            launcher_class: DEFAULT_LAUNCHER_CLASS.to_string(),
            driver_max_heap_mb: None,
            extra_classpath: Vec::new(),
        }
    }
}

impl YarnJobCommandProvider {
    fn classpath(&self) -> String {
        let mut entries = vec![
            format!("{REEF_FOLDER}/{LOCAL_FOLDER}/*"),
            format!("{REEF_FOLDER}/{GLOBAL_FOLDER}/*"),
        ];
        entries.extend(self.extra_classpath.iter().cloned());
        entries.join(CLASSPATH_SEPARATOR)
    }
}

impl JobCommandProvider for YarnJobCommandProvider {
    fn job_submission_command(&self) -> String {
        let mut parts = vec![self.java_path.clone()];
        if let Some(heap) = self.driver_max_heap_mb {
            parts.push(format!("-Xmx{heap}m"));
        }
        parts.push("-classpath".to_string());
        parts.push(self.classpath());
        parts.push(self.launcher_class.clone());
        parts.push(job_submission_parameters_container_path());
        parts.push(format!("1>{LOG_DIR}/driver.stdout"));
        parts.push(format!("2>{LOG_DIR}/driver.stderr"));
        parts.join(" ")
    }
}
