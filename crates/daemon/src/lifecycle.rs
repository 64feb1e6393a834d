// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown, recovery.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use fs2::FileExt;
use tally_adapters::{
    BusNotifyAdapter, CollectExecutor, RoutingExecutor, ShellExecutor, TracedExecutor,
    TracedNotify,
};
use tally_core::{EventBus, JobDescriptor, SystemClock, TaskInstance, UuidIdGen};
use tally_engine::{Engine, EngineHandle, Runtime, RuntimeDeps, RuntimeError};
use tally_jobfile::JobFileError;
use tally_storage::{EventedEntityStore, FileStore, StoreError};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{ConfigError, Settings};
use crate::env::state_dir;

/// Executor stack: shell commands and collection requests, both traced
pub type DaemonExecutor = TracedExecutor<
    RoutingExecutor<ShellExecutor<UuidIdGen>, CollectExecutor<UuidIdGen>>,
>;

pub type DaemonNotifier = TracedNotify<BusNotifyAdapter>;

/// Engine with concrete adapter types (wrapped with tracing)
pub type DaemonEngine = Engine<DaemonExecutor, DaemonNotifier, SystemClock, UuidIdGen>;

/// Daemon version, written to the version file and printed by `--version`
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/tally)
    pub state_dir: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to version file
    pub version_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Persisted job descriptors
    pub jobs_path: PathBuf,
    /// Persisted task instances
    pub tasks_path: PathBuf,
    /// Settings from `config.toml`
    pub settings: Settings,
}

impl Config {
    /// Load configuration for the user-level daemon.
    ///
    /// Uses fixed paths under `~/.local/state/tally/` (or `$XDG_STATE_HOME/tally/`).
    pub fn load() -> Result<Self, LifecycleError> {
        Self::at(state_dir()?)
    }

    /// Configuration rooted at an explicit state directory.
    pub fn at(state_dir: PathBuf) -> Result<Self, LifecycleError> {
        let settings = Settings::load(&state_dir)?;
        Ok(Self {
            lock_path: state_dir.join("daemon.pid"),
            version_path: state_dir.join("daemon.version"),
            log_path: state_dir.join("daemon.log"),
            jobs_path: state_dir.join("jobs.json"),
            tasks_path: state_dir.join("tasks.json"),
            settings,
            state_dir,
        })
    }
}

/// Daemon state during operation.
pub struct DaemonState {
    /// Configuration
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    /// Query and control surface of the engine
    pub handle: EngineHandle,
    /// When daemon started
    pub start_time: Instant,
}

/// Result of daemon startup: the daemon state and the engine to run.
pub struct StartupResult {
    pub daemon: DaemonState,
    /// Recovered engine, ready for `run`
    pub engine: DaemonEngine,
}

impl DaemonState {
    /// Remove the PID and version files.
    ///
    /// Persisted jobs and tasks stay in place; the next startup recovers them.
    pub fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        // 1. Remove PID file
        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        // 2. Remove version file
        if self.config.version_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.version_path) {
                warn!("Failed to remove version file: {}", e);
            }
        }

        // 3. Lock file is released automatically when self.lock_file is dropped

        info!(
            uptime_secs = self.start_time.elapsed().as_secs(),
            "Daemon shutdown complete"
        );
        Ok(())
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Job file error: {0}")]
    JobFile(#[from] JobFileError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon
pub async fn startup(config: &Config) -> Result<StartupResult, LifecycleError> {
    match startup_inner(config).await {
        Ok(result) => Ok(result),
        Err(e) => {
            // Don't clean up if we failed to acquire the lock:
            // those files belong to the already-running daemon.
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(config);
            }
            Err(e)
        }
    }
}

/// Inner startup logic - cleanup_on_failure called if this fails
async fn startup_inner(config: &Config) -> Result<StartupResult, LifecycleError> {
    // 1. Create state directory (needed for lock, stores, etc.)
    std::fs::create_dir_all(&config.state_dir)?;

    // 2. Acquire lock file FIRST - prevents races
    // Use OpenOptions to avoid truncating the file before we hold the lock,
    // which would wipe the running daemon's PID.
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    // Write PID to lock file (truncate now that we hold the lock)
    use std::io::Write;
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file; // Drop mutability

    // Write version file
    std::fs::write(&config.version_path, VERSION)?;

    // 3. Open stores
    let settings = &config.settings;
    let mode = settings.delete_mode();
    let jobs = FileStore::<JobDescriptor>::open(&config.jobs_path, mode)?;
    let tasks = FileStore::<TaskInstance>::open(&config.tasks_path, mode)?;

    // 4. Wire adapters
    let bus = EventBus::default();
    let actions = TracedExecutor::new(RoutingExecutor::new(
        ShellExecutor::new(bus.clone(), settings.shell_config(), UuidIdGen),
        CollectExecutor::new(bus.clone(), UuidIdGen),
    ));
    let notifier = TracedNotify::new(BusNotifyAdapter::new(bus.clone()));
    let runtime = Runtime::new(
        RuntimeDeps {
            actions,
            notifier,
            bus: bus.clone(),
            jobs: Arc::new(EventedEntityStore::new(jobs, bus.clone())),
            tasks: Arc::new(EventedEntityStore::new(tasks, bus.clone())),
            ids: UuidIdGen,
        },
        SystemClock,
        settings.runtime_config(),
    );
    let (mut engine, handle) = Engine::new(runtime, settings.tick_interval);

    // 5. Resume persisted tasks before any new stimulus is taken
    let resumed = engine.recover().await?;

    // 6. Install the configured job file over the persisted descriptors
    let mut defined = 0;
    if let Some(path) = settings.jobs_path(&config.state_dir) {
        let descriptors = tally_jobfile::load_jobs(&path)?;
        defined = engine.runtime_mut().define_jobs(descriptors).await?.len();
        info!(path = %path.display(), jobs = defined, "loaded job file");
    }

    info!(
        state_dir = %config.state_dir.display(),
        resumed,
        defined,
        "daemon state ready"
    );

    Ok(StartupResult {
        daemon: DaemonState {
            config: config.clone(),
            lock_file,
            handle,
            start_time: Instant::now(),
        },
        engine,
    })
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    // Remove PID file if we created it
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }

    // Remove version file if we created it
    if config.version_path.exists() {
        let _ = std::fs::remove_file(&config.version_path);
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
