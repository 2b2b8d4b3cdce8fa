//! PBR Forge - generate PBR materials from a text prompt
//!
//! Headless host: submits one generation job, polls it on a fixed tick and
//! writes the finished material to disk.

use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use pbrforge_config::ForgeConfig;
use pbrforge_diffusion::{
    DirectorySink, JobController, MaterialSink, Outcome, RemoteBackend, apply_normal_strength,
};
use pbrforge_ipc::ForgeToHost;
use pbrforge_maps::NormalConverter;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod cli;
mod config;

use cli::{CliArgs, Command};
use config::RunConfig;

fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_tracing(args.verbose);

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr so `--events` output on stdout stays machine-readable
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: CliArgs) -> Result<ExitCode> {
    let mut forge = ForgeConfig::from_env();
    if let Some(url) = args.backend_url {
        forge.backend_url = url.trim_end_matches('/').to_string();
    }

    match args.command {
        Command::Generate(generate) => generate_material(RunConfig::resolve(generate, forge)?),
        Command::Health => check_health(&forge),
        Command::SetStrength { manifest, strength } => {
            let updated = apply_normal_strength(&manifest, strength)
                .with_context(|| format!("updating {}", manifest.display()))?;
            info!(
                "{}: normal strength is now {}",
                updated.name, updated.settings.normal_strength
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn check_health(forge: &ForgeConfig) -> Result<ExitCode> {
    let backend = RemoteBackend::from_config(forge)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let health = runtime
        .block_on(backend.health())
        .with_context(|| format!("backend at {} is not reachable", backend.server_url()))?;
    info!(
        "Backend {} is {} on {}",
        backend.server_url(),
        health.status,
        health.device
    );
    Ok(ExitCode::SUCCESS)
}

fn generate_material(config: RunConfig) -> Result<ExitCode> {
    let backend = RemoteBackend::from_config(&config.forge)?;
    let converter = NormalConverter::new(config.forge.height_to_normal_strength)
        .context("invalid height-to-normal strength")?;
    let mut controller = JobController::new(backend)?.with_normal_converter(converter);

    info!(
        "Generating {} material via {}",
        config.request.resolution,
        controller.backend().server_url()
    );
    let handle = controller.submit(config.request.clone())?;
    let job_id = handle.id().get();

    let started = Instant::now();
    let max_wait = config.max_wait_secs.map(Duration::from_secs);
    let mut cancel_sent = false;
    let mut last_reported: Option<(f32, String)> = None;

    loop {
        let status = controller.poll(handle)?;

        let snapshot = (status.progress, status.status.clone());
        if last_reported.as_ref() != Some(&snapshot) {
            info!("[{:>3.0}%] {}", status.progress * 100.0, status.status);
            emit(
                config.emit_events,
                &ForgeToHost::JobProgress {
                    job_id,
                    progress: status.progress,
                    status: status.status.clone(),
                },
            );
            last_reported = Some(snapshot);
        }

        if status.terminal {
            break;
        }

        if !cancel_sent && max_wait.is_some_and(|limit| started.elapsed() >= limit) {
            warn!("Job exceeded --max-wait; cancelling");
            controller.cancel_request(handle)?;
            cancel_sent = true;
        }

        thread::sleep(config.forge.poll_interval());
    }

    match controller.consume_outcome(handle)? {
        Outcome::Success(textures) => {
            let textures = match config.resize {
                Some((size, filter)) => textures.resized(size, filter),
                None => textures,
            };

            let mut sink = DirectorySink::new(&config.forge.output_dir);
            let material = sink.apply(&textures, &config.settings)?;
            info!(
                "Material {} written to {}",
                material.name,
                sink.material_dir(&material.name).display()
            );
            emit(
                config.emit_events,
                &ForgeToHost::JobComplete { job_id, material },
            );
            Ok(ExitCode::SUCCESS)
        }
        Outcome::Failed(e) => {
            error!("Generation failed: {e}");
            if e.suggests_lower_resolution() {
                warn!("Retry with --resolution 512");
            }
            emit(
                config.emit_events,
                &ForgeToHost::Error {
                    code: e.code().to_string(),
                    message: e.to_string(),
                },
            );
            Ok(ExitCode::FAILURE)
        }
        Outcome::Cancelled => {
            warn!("Generation cancelled");
            emit(config.emit_events, &ForgeToHost::JobCancelled { job_id });
            Ok(ExitCode::from(2))
        }
    }
}

fn emit(enabled: bool, message: &ForgeToHost) {
    if !enabled {
        return;
    }
    match message.to_json_line() {
        Ok(line) => println!("{line}"),
        Err(e) => warn!("Failed to serialize host event: {e}"),
    }
}
