// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tally Daemon (tallyd)
//!
//! Background process that owns the engine loop and dispatches work.
//!
//! Architecture:
//! - Engine Task: spawned loop taking bus events, ticks, and control commands
//! - Main Task: waits for a termination signal, then stops the engine

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod config;
mod env;
mod lifecycle;

use std::path::Path;
use std::process::ExitCode;

use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};

use crate::lifecycle::{Config, LifecycleError, StartupResult, VERSION};

const USAGE: &str = "Usage: tallyd [--help | --version | check <jobfile>]";

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    // Handle info flags before any config/lock acquisition
    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Some(arg) = args.first() {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("tallyd {VERSION}");
                return Ok(ExitCode::SUCCESS);
            }
            "--help" | "-h" | "help" => {
                println!("tallyd {VERSION}");
                println!("Tally Daemon - runs job descriptors as tracked task instances");
                println!();
                println!("USAGE:");
                println!("    tallyd");
                println!("    tallyd check <jobfile>");
                println!();
                println!("State lives in $TALLY_STATE_DIR (default ~/.local/state/tally).");
                println!("Settings are read from config.toml in that directory.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(ExitCode::SUCCESS);
            }
            "check" => {
                let Some(path) = args.get(1) else {
                    eprintln!("error: check needs a job file");
                    eprintln!("{USAGE}");
                    return Ok(ExitCode::FAILURE);
                };
                return Ok(check(Path::new(path)));
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("{USAGE}");
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    // Load configuration (user-level daemon)
    let config = Config::load()?;

    // Write startup marker to log (before tracing setup, so it always lands)
    write_startup_marker(&config)?;

    // Set up logging
    let log_guard = setup_logging(&config)?;

    info!("Starting user-level daemon");

    let StartupResult { mut daemon, engine } = match lifecycle::startup(&config).await {
        Ok(r) => r,
        Err(LifecycleError::LockFailed(_)) => {
            // Another daemon is already running; print a human-readable message
            // instead of a raw debug error.
            let pid = std::fs::read_to_string(&config.lock_path)
                .unwrap_or_default()
                .trim()
                .to_string();
            let version = std::fs::read_to_string(&config.version_path)
                .unwrap_or_default()
                .trim()
                .to_string();

            eprintln!("tallyd is already running");
            if !pid.is_empty() {
                eprintln!("  pid: {pid}");
            }
            if !version.is_empty() {
                if version == VERSION {
                    eprintln!("  version: {version}");
                } else {
                    eprintln!("  version: {version} (outdated, current: {VERSION})");
                }
            }
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => {
            // Write error synchronously (tracing is non-blocking and may not flush in time)
            write_startup_error(&config, &e);
            error!("Failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    let mut running = tokio::spawn(engine.run());

    // Set up signal handlers
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!(state_dir = %config.state_dir.display(), "Daemon ready");

    // Signal ready for a supervising parent process
    println!("READY");

    let stopped_early = tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down...");
            false
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down...");
            false
        }
        result = &mut running => {
            if let Err(e) = result {
                error!("Engine task failed: {}", e);
            }
            true
        }
    };

    if !stopped_early {
        // The loop finishes the stimulus in hand before it observes this
        if let Err(e) = daemon.handle.shutdown().await {
            warn!("Engine already stopped: {}", e);
        }
        if let Err(e) = running.await {
            error!("Engine task failed: {}", e);
        }
    }

    daemon.shutdown()?;
    info!("Daemon stopped");
    Ok(ExitCode::SUCCESS)
}

/// Validate a job file without starting the daemon.
fn check(path: &Path) -> ExitCode {
    match tally_jobfile::load_jobs(path) {
        Ok(jobs) => {
            println!("{}: {} job(s) ok", path.display(), jobs.len());
            for job in &jobs {
                println!("  {} ({} step(s))", job.id, job.steps.len());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {}", path.display(), e);
            ExitCode::FAILURE
        }
    }
}

/// Startup marker prefix written to log before anything else.
/// Full format: "--- tallyd: starting (pid: 12345) ---"
pub const STARTUP_MARKER_PREFIX: &str = "--- tallyd: starting (pid: ";

/// Write startup marker to log file (appends to existing log)
fn write_startup_marker(config: &Config) -> Result<(), LifecycleError> {
    use std::io::Write;

    // Create log directory if needed
    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Append marker to log file with PID
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)?;
    writeln!(file, "{}{}) ---", STARTUP_MARKER_PREFIX, std::process::id())?;

    Ok(())
}

/// Write startup error synchronously to log file.
fn write_startup_error(config: &Config, error: &LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR Failed to start daemon: {}", error);
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    // Create log directory if needed
    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Set up file appender
    let file_appender = tracing_appender::rolling::never(
        config.log_path.parent().ok_or(LifecycleError::NoStateDir)?,
        config
            .log_path
            .file_name()
            .ok_or(LifecycleError::NoStateDir)?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Set up subscriber with env filter
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
