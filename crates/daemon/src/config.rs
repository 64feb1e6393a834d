// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon settings, read from `config.toml` in the state directory.
//!
//! Every key is optional. Durations accept either milliseconds or a
//! string such as `"30s"` or `"5m"`.
//!
//! ```toml
//! jobs_file = "jobs.toml"
//! tick_interval = "1s"
//! persist_retries = 5
//!
//! [start_on_subscriber]
//! channel = "collectors"
//! timeout = "2m"
//! jobs = ["inventory"]
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tally_adapters::ShellConfig;
use tally_core::time_fmt::duration_serde;
use tally_core::JobId;
use tally_engine::{RetryPolicy, RuntimeConfig, StartOnSubscriber};
use tally_storage::DeleteMode;
use thiserror::Error;

/// File name of the settings file inside the state directory.
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid settings in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Job file loaded at startup. Relative paths resolve against the state dir.
    pub jobs_file: Option<PathBuf>,
    #[serde(with = "duration_serde")]
    pub tick_interval: Duration,
    #[serde(with = "duration_serde")]
    pub store_timeout: Duration,
    /// Total write attempts before a task is forced to failed.
    pub persist_retries: u32,
    #[serde(with = "duration_serde")]
    pub persist_backoff: Duration,
    /// Deleting an unknown id is an error instead of a no-op.
    pub strict_delete: bool,
    pub retain_finished: usize,
    #[serde(with = "duration_serde")]
    pub command_timeout: Duration,
    pub shell: String,
    pub work_dir: Option<PathBuf>,
    pub start_on_subscriber: Option<SubscriberSettings>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubscriberSettings {
    pub channel: String,
    #[serde(with = "duration_serde")]
    pub timeout: Duration,
    pub jobs: Vec<JobId>,
}

impl Default for Settings {
    fn default() -> Self {
        let runtime = RuntimeConfig::default();
        let shell = ShellConfig::default();
        Self {
            jobs_file: None,
            tick_interval: Duration::from_secs(1),
            store_timeout: runtime.store_timeout,
            persist_retries: runtime.retry.attempts,
            persist_backoff: runtime.retry.base_delay,
            strict_delete: false,
            retain_finished: runtime.retain_finished,
            command_timeout: shell.timeout,
            shell: shell.shell,
            work_dir: None,
            start_on_subscriber: None,
        }
    }
}

impl Settings {
    /// Read `config.toml` from `state_dir`, or defaults when it is absent.
    pub fn load(state_dir: &Path) -> Result<Self, ConfigError> {
        let path = state_dir.join(CONFIG_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => return Err(ConfigError::Io { path, source }),
        };
        Self::parse(&content).map_err(|source| ConfigError::Parse { path, source })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Absolute path of the startup job file, if one is configured.
    pub fn jobs_path(&self, state_dir: &Path) -> Option<PathBuf> {
        self.jobs_file.as_ref().map(|p| state_dir.join(p))
    }

    pub fn delete_mode(&self) -> DeleteMode {
        if self.strict_delete {
            DeleteMode::Strict
        } else {
            DeleteMode::Lenient
        }
    }

    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            retry: RetryPolicy {
                attempts: self.persist_retries.max(1),
                base_delay: self.persist_backoff,
                ..RetryPolicy::default()
            },
            store_timeout: self.store_timeout,
            retain_finished: self.retain_finished,
            start_on_subscriber: self.start_on_subscriber.as_ref().map(|s| StartOnSubscriber {
                channel: s.channel.clone(),
                timeout: s.timeout,
                jobs: s.jobs.clone(),
            }),
        }
    }

    pub fn shell_config(&self) -> ShellConfig {
        ShellConfig {
            shell: self.shell.clone(),
            work_dir: self.work_dir.clone(),
            timeout: self.command_timeout,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
