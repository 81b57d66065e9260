//! Preparación de la carpeta local de staging.
//!
//! Layout resultante:
//!   <root>/reef-<jobId>-<appId>/reef/global/...   archivos globales
//!   <root>/reef-<jobId>-<appId>/reef/local/...    archivos locales, driver.conf
//!   <root>/reef-<jobId>-<appId>/reef/local/job-submission-params.json

use common::files::{
    global_folder_path, job_submission_parameters_path, local_folder_path, staging_folder_name,
    DRIVER_CONFIGURATION_FILE, JOB_SUBMISSION_PARAMETERS_FILE,
};
use common::{ConfigError, ConfigurationFragment, JobSubmission, YarnJobSubmissionParameters};
use std::{
    fs::{self, File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum StageError {
    #[error("la carpeta de staging ya existe: {0}")]
    FolderExists(PathBuf),

    #[error("el archivo de parámetros ya existe: {0}")]
    ParametersExist(PathBuf),

    #[error("no existe el archivo declarado por el job: {0}")]
    MissingFile(PathBuf),

    #[error("dos archivos del job terminan en el mismo destino: {0}")]
    DuplicateFile(PathBuf),

    #[error("el archivo del job usa un nombre reservado del driver: {0}")]
    ReservedName(PathBuf),

    #[error("configuración del driver inválida: {0}")]
    Configuration(#[from] ConfigError),

    #[error("error de E/S en {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("error serializando {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("la tarea de staging terminó inesperadamente: {0}")]
    Interrupted(String),
}

impl StageError {
    fn io(path: &Path, source: io::Error) -> Self {
        StageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// true si el error viene de reutilizar una carpeta o archivo de otro envío
    pub fn is_collision(&self) -> bool {
        matches!(self, StageError::FolderExists(_) | StageError::ParametersExist(_))
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            StageError::FolderExists(p)
            | StageError::ParametersExist(p)
            | StageError::MissingFile(p)
            | StageError::DuplicateFile(p)
            | StageError::ReservedName(p) => Some(p),
            StageError::Io { path, .. } | StageError::Serialize { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Crea `<root>/reef-<jobId>-<appId>`. Falla si ya existe: nunca se reutiliza.
pub fn create_staging_folder(
    root: &Path,
    job_id: &str,
    application_id: &str,
) -> Result<PathBuf, StageError> {
    fs::create_dir_all(root).map_err(|e| StageError::io(root, e))?;

    let folder = root.join(staging_folder_name(job_id, application_id));
    match fs::create_dir(&folder) {
        Ok(()) => Ok(folder),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(StageError::FolderExists(folder)),
        Err(e) => Err(StageError::io(&folder, e)),
    }
}

/// Nombres que escribe el cliente en `reef/local`; ningún archivo del job puede usarlos
const RESERVED_LOCAL_NAMES: [&str; 2] = [JOB_SUBMISSION_PARAMETERS_FILE, DRIVER_CONFIGURATION_FILE];

/// Llena la carpeta del driver con los archivos del job y su configuración.
/// Se llama una sola vez por carpeta, justo después de crearla.
pub fn prepare_driver_folder(job: &JobSubmission, folder: &Path) -> Result<(), StageError> {
    let local = folder.join(local_folder_path());
    let global = folder.join(global_folder_path());
    fs::create_dir_all(&local).map_err(|e| StageError::io(&local, e))?;
    fs::create_dir_all(&global).map_err(|e| StageError::io(&global, e))?;

    for file in job.global_files() {
        copy_into(file, &global)?;
    }
    for file in job.local_files() {
        let reserved = file
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| RESERVED_LOCAL_NAMES.contains(&n));
        if reserved {
            return Err(StageError::ReservedName(file.to_path_buf()));
        }
        copy_into(file, &local)?;
    }

    // configuración del driver ya mezclada, la lee el lado remoto
    let merged = ConfigurationFragment::merge(job.driver_configurations())?;
    let conf_path = local.join(DRIVER_CONFIGURATION_FILE);
    let bytes = serde_json::to_vec_pretty(&merged).map_err(|e| StageError::Serialize {
        path: conf_path.clone(),
        source: e,
    })?;
    let conf = match OpenOptions::new().write(true).create_new(true).open(&conf_path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(StageError::ReservedName(conf_path))
        }
        Err(e) => return Err(StageError::io(&conf_path, e)),
    };
    write_or_discard(conf, &conf_path, &bytes, File::sync_all)?;

    debug!(
        "carpeta del driver lista en {} ({} globales, {} locales)",
        folder.display(),
        job.global_files().len(),
        job.local_files().len()
    );
    Ok(())
}

/// Copia un archivo o una carpeta completa dentro de `dest`, conservando el nombre.
fn copy_into(source: &Path, dest: &Path) -> Result<(), StageError> {
    let name = source
        .file_name()
        .ok_or_else(|| StageError::MissingFile(source.to_path_buf()))?;
    let target = dest.join(name);

    if !source.exists() {
        return Err(StageError::MissingFile(source.to_path_buf()));
    }
    if target.exists() {
        return Err(StageError::DuplicateFile(target));
    }

    if source.is_file() {
        fs::copy(source, &target).map_err(|e| StageError::io(source, e))?;
        return Ok(());
    }

    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(source).to_path_buf();
            StageError::Io {
                path,
                source: e.into(),
            }
        })?;

        let rel = entry
            .path()
            .strip_prefix(source)
            .map_err(|_| StageError::MissingFile(entry.path().to_path_buf()))?;
        let out = target.join(rel);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&out).map_err(|e| StageError::io(&out, e))?;
        } else {
            fs::copy(entry.path(), &out).map_err(|e| StageError::io(entry.path(), e))?;
        }
    }

    Ok(())
}

/// Escribe el descriptor de parámetros exactamente una vez.
/// Si el archivo ya existe no se toca; si la escritura falla a medias se borra.
pub fn write_submission_parameters(
    folder: &Path,
    params: &YarnJobSubmissionParameters,
) -> Result<PathBuf, StageError> {
    let path = folder.join(job_submission_parameters_path());

    // serializar antes de crear el archivo para no dejarlo a medias
    let bytes = params.to_json_bytes().map_err(|e| StageError::Serialize {
        path: path.clone(),
        source: e,
    })?;

    let file: File = match OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(StageError::ParametersExist(path))
        }
        Err(e) => return Err(StageError::io(&path, e)),
    };

    write_or_discard(file, &path, &bytes, File::sync_all)?;
    Ok(path)
}

/// Escribe `bytes` completos en `out` o borra `path`: nunca queda un archivo a medias.
fn write_or_discard<W: Write>(
    mut out: W,
    path: &Path,
    bytes: &[u8],
    sync: impl FnOnce(&W) -> io::Result<()>,
) -> Result<(), StageError> {
    let written = out
        .write_all(bytes)
        .and_then(|_| out.flush())
        .and_then(|_| sync(&out));

    if let Err(e) = written {
        drop(out);
        let _ = fs::remove_file(path);
        return Err(StageError::io(path, e));
    }
    Ok(())
}
