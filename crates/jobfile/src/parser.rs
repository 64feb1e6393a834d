// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job file parsing (TOML, HCL, and JSON)
//!
//! Jobs are keyed by id under `job`:
//!
//! ```toml
//! [job.nightly]
//! schedule = "0 2 * * *"
//!
//! [[job.nightly.step]]
//! name = "collect"
//! collect = { cloud = "aws" }
//! timeout = "10m"
//! wait = { on = "collect-done", timeout = "5m" }
//! ```
//!
//! A job starts on either `on = "<event kind>"` or `schedule = "<cron>"`.
//! A step runs either a shell command (`run`) or hands `collect` to
//! external collectors.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tally_core::{
    parse_duration, JobDescriptor, JobId, StepAction, StepDef, SurpassBehaviour,
    TriggerConfigError, TriggerSpec, ValidationError, WaitSpec,
};
use thiserror::Error;

/// Job file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Toml,
    Hcl,
    Json,
}

impl Format {
    /// Format implied by the file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "toml" => Some(Format::Toml),
            "hcl" => Some(Format::Hcl),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

/// Errors that can occur while loading a job file
#[derive(Debug, Error)]
pub enum JobFileError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("unrecognized job file extension: {}", .0.display())]
    UnknownFormat(PathBuf),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HCL parse error: {0}")]
    Hcl(#[from] hcl::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid format for {location}: {message}")]
    InvalidFormat { location: String, message: String },

    #[error("invalid trigger in {location}: {source}")]
    Trigger {
        location: String,
        source: TriggerConfigError,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

#[derive(Debug, Default, Deserialize)]
struct JobFile {
    #[serde(default, alias = "jobs")]
    job: BTreeMap<String, JobDef>,
}

/// One or more values; HCL yields a bare object for a single repeated block.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(v) => v,
            OneOrMany::One(t) => vec![t],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct TriggerDef {
    #[serde(default)]
    on: Option<String>,
    #[serde(default)]
    schedule: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WaitDef {
    #[serde(flatten)]
    trigger: TriggerDef,
    timeout: String,
}

#[derive(Debug, Deserialize)]
struct StepFileDef {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    run: Option<String>,
    #[serde(default)]
    collect: Option<Value>,
    timeout: String,
    #[serde(default)]
    wait: Option<WaitDef>,
}

#[derive(Debug, Deserialize)]
struct JobDef {
    #[serde(flatten)]
    trigger: TriggerDef,
    #[serde(default, alias = "steps")]
    step: OneOrMany<StepFileDef>,
    #[serde(default)]
    wait: Option<WaitDef>,
    #[serde(default)]
    concurrency: Option<u32>,
    #[serde(default)]
    on_surpass: Option<SurpassBehaviour>,
    #[serde(default)]
    active: Option<bool>,
}

/// Read and parse a job file, choosing the format by extension.
pub fn load_jobs(path: &Path) -> Result<Vec<JobDescriptor>, JobFileError> {
    let format =
        Format::from_path(path).ok_or_else(|| JobFileError::UnknownFormat(path.to_path_buf()))?;
    let content = std::fs::read_to_string(path).map_err(|source| JobFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let jobs = parse_jobs(&content, format)?;
    tracing::debug!(path = %path.display(), count = jobs.len(), "loaded job file");
    Ok(jobs)
}

/// Parse job descriptors from `content`. Every descriptor is validated.
pub fn parse_jobs(content: &str, format: Format) -> Result<Vec<JobDescriptor>, JobFileError> {
    // 1. Serde does the heavy lifting
    let file: JobFile = match format {
        Format::Toml => toml::from_str(content)?,
        Format::Hcl => hcl::from_str(content)?,
        Format::Json => serde_json::from_str(content)?,
    };

    // 2. Convert and validate, ordered by id
    let mut jobs = Vec::with_capacity(file.job.len());
    for (id, def) in file.job {
        let job = convert_job(&id, def)?;
        job.validate()?;
        jobs.push(job);
    }
    Ok(jobs)
}

fn convert_job(id: &str, def: JobDef) -> Result<JobDescriptor, JobFileError> {
    let location = format!("job.{}", id);
    let trigger = convert_trigger(&location, def.trigger)?;
    let wait = def
        .wait
        .map(|w| convert_wait(&format!("{}.wait", location), w))
        .transpose()?;

    let steps = def
        .step
        .into_vec()
        .into_iter()
        .enumerate()
        .map(|(i, step)| convert_step(&format!("{}.step[{}]", location, i), step))
        .collect::<Result<Vec<_>, _>>()?;

    let mut job = JobDescriptor::new(JobId::new(id), trigger, steps);
    job.wait = wait;
    if let Some(concurrency) = def.concurrency {
        job.concurrency = concurrency;
    }
    if let Some(on_surpass) = def.on_surpass {
        job.on_surpass = on_surpass;
    }
    if let Some(active) = def.active {
        job.active = active;
    }
    Ok(job)
}

fn convert_step(location: &str, def: StepFileDef) -> Result<StepDef, JobFileError> {
    let action = match (def.run, def.collect) {
        (Some(command), None) => StepAction::command(command),
        (None, Some(target)) => StepAction::collect(target),
        (Some(_), Some(_)) => {
            return Err(invalid(location, "step must set only one of 'run' or 'collect'"))
        }
        (None, None) => return Err(invalid(location, "step requires 'run' or 'collect'")),
    };
    let timeout = duration(&format!("{}.timeout", location), &def.timeout)?;

    let mut step = StepDef::new(action, timeout);
    if let Some(name) = def.name {
        step = step.named(name);
    }
    if let Some(wait) = def.wait {
        step = step.with_wait(convert_wait(&format!("{}.wait", location), wait)?);
    }
    Ok(step)
}

fn convert_wait(location: &str, def: WaitDef) -> Result<WaitSpec, JobFileError> {
    Ok(WaitSpec::new(
        convert_trigger(location, def.trigger)?,
        duration(&format!("{}.timeout", location), &def.timeout)?,
    ))
}

fn convert_trigger(location: &str, def: TriggerDef) -> Result<TriggerSpec, JobFileError> {
    match (def.on, def.schedule) {
        (Some(name), None) => Ok(TriggerSpec::event(name)),
        (None, Some(expr)) => TriggerSpec::time(&expr).map_err(|source| JobFileError::Trigger {
            location: location.to_string(),
            source,
        }),
        (Some(_), Some(_)) => Err(invalid(location, "set only one of 'on' or 'schedule'")),
        (None, None) => Err(invalid(location, "requires 'on' or 'schedule'")),
    }
}

fn duration(location: &str, raw: &str) -> Result<std::time::Duration, JobFileError> {
    parse_duration(raw).map_err(|message| invalid(location, &message))
}

fn invalid(location: &str, message: &str) -> JobFileError {
    JobFileError::InvalidFormat {
        location: location.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
#[path = "parser_tests/mod.rs"]
mod tests;
