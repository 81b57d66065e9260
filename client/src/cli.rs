use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client::config::DEFAULT_PROFILE;
use client::{ClientConfig, FileSystemJobResourceUploader, JobSubmitter, YarnRestClient};
use common::submission::DEFAULT_DRIVER_MEMORY_MB;
use common::{CountersData, JobSubmission, SysinfoSensor};
use std::{collections::BTreeSet, path::PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "client")]
#[command(about = "CLI para enviar jobs REEF a un cluster YARN")]
struct Cli {
    /// Perfil del archivo de configuración
    #[arg(long, global = true, default_value = DEFAULT_PROFILE)]
    profile: String,

    /// Archivo TOML con perfiles (si no, REEF_CLIENT_CONFIG)
    #[arg(long, global = true, value_name = "ARCHIVO")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Envía un job y muestra el id de aplicación asignado
    Submit {
        #[arg(value_name = "JOB_ID")]
        job_id: String,

        /// Memoria del driver en MB
        #[arg(long, default_value_t = DEFAULT_DRIVER_MEMORY_MB)]
        driver_memory: u32,

        /// Archivo o carpeta compartido entre driver y evaluadores (repetible)
        #[arg(long = "global-file", value_name = "RUTA")]
        global_files: Vec<PathBuf>,

        /// Archivo o carpeta solo para el driver (repetible)
        #[arg(long = "local-file", value_name = "RUTA")]
        local_files: Vec<PathBuf>,

        /// Parámetro del driver, pisa el valor del perfil (repetible)
        #[arg(long = "set", value_name = "CLAVE=VALOR", value_parser = parse_key_val)]
        overrides: Vec<(String, String)>,
    },
    /// Consulta el estado final de una aplicación
    Status {
        #[arg(value_name = "APPLICATION_ID")]
        id: String,
    },
}

fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("se esperaba CLAVE=VALOR, llegó '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("clave vacía en '{raw}'"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

/// Devuelve los contadores si crecieron desde el último sink y los marca como enviados.
fn sink_counters(data: &CountersData) -> Option<BTreeSet<(String, String)>> {
    if !data.trigger_sink(0) {
        return None;
    }
    let pending = data.counter_data();
    data.reset();
    Some(pending)
}

pub async fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("client=info,reqwest=info")),
        )
        .init();

    let cli = Cli::parse();

    let config = ClientConfig::load(cli.config.as_deref())?;
    let mut profile = config.profile(&cli.profile)?;
    profile.apply_env_overrides();

    info!("perfil {} (RM en {})", cli.profile, profile.rm_url);
    debug!("{}", SysinfoSensor::new().report());

    let rm = YarnRestClient::new(profile.rm_url.clone()).with_credentials(profile.credentials());
    let uploader = FileSystemJobResourceUploader::new(
        profile.remote_root.clone(),
        profile.remote_uri_prefix.clone(),
    );
    let submitter = JobSubmitter::new(
        rm,
        uploader,
        profile.command_provider(),
        profile.job_submission_directory_prefix.clone(),
        profile.staging_root(),
    );

    match cli.command {
        Commands::Submit {
            job_id,
            driver_memory,
            global_files,
            local_files,
            overrides,
        } => {
            let mut builder = JobSubmission::builder()
                .job_identifier(job_id.clone())
                .driver_memory_mb(driver_memory)
                .add_driver_configuration(profile.driver_configuration(&overrides));
            for path in global_files {
                builder = builder.add_global_file(path);
            }
            for path in local_files {
                builder = builder.add_local_file(path);
            }
            let job = builder.build()?;

            let result = submitter.submit(&job).await;

            let counters = CountersData::new();
            counters.update(&submitter.counters().snapshot());
            if let Some(pending) = sink_counters(&counters) {
                for (name, value) in pending {
                    debug!("contador {} = {}", name, value);
                }
            }

            let application_id = result.with_context(|| format!("enviando el job {job_id}"))?;

            println!("Aplicación enviada:");
            println!("  id: {}", application_id);
            println!("  job: {}", job.job_identifier());
            println!("  memoria del driver: {} MB", job.driver_memory_mb());
            println!(
                "  staging: {}",
                submitter
                    .staging_root()
                    .join(common::files::staging_folder_name(&job_id, &application_id))
                    .display()
            );
        }
        Commands::Status { id } => {
            let status = submitter.get_job_final_status(&id).await?;
            println!("Aplicación:");
            println!("  id: {}", id);
            println!("  estado final: {:?}", status);
        }
    }

    Ok(())
}
