// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job descriptors: immutable definitions of multi-step scheduled work.

use crate::schedule::TriggerConfigError;
use crate::time_fmt::duration_serde;
use crate::trigger::{TriggerSpec, WaitSpec};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

crate::define_id! {
    /// Caller-assigned identifier of a job descriptor.
    pub struct JobId;
}

/// Work a step hands to an executor. The engine never interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepAction {
    ExecuteCommand {
        command: String,
    },
    CollectWork {
        #[serde(default)]
        target: Value,
    },
}

impl StepAction {
    pub fn command(command: impl Into<String>) -> Self {
        StepAction::ExecuteCommand {
            command: command.into(),
        }
    }

    pub fn collect(target: Value) -> Self {
        StepAction::CollectWork { target }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StepAction::ExecuteCommand { .. } => "execute_command",
            StepAction::CollectWork { .. } => "collect_work",
        }
    }
}

/// One step of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDef {
    /// Defaults to `step-<n>` (1-based) when left empty.
    #[serde(default)]
    pub name: String,
    pub action: StepAction,
    /// Step deadline: the action must complete within this time.
    #[serde(with = "duration_serde")]
    pub timeout: Duration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait: Option<WaitSpec>,
}

impl StepDef {
    pub fn new(action: StepAction, timeout: Duration) -> Self {
        Self {
            name: String::new(),
            action,
            timeout,
            wait: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_wait(mut self, wait: WaitSpec) -> Self {
        self.wait = Some(wait);
        self
    }
}

/// What happens when a start trigger fires while `concurrency` live
/// instances already exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurpassBehaviour {
    /// Drop the start.
    #[default]
    Skip,
    /// Cancel the oldest live instance and start anyway.
    Replace,
    /// Queue a single pending start until a live instance finishes.
    Wait,
}

fn default_concurrency() -> u32 {
    1
}

fn default_active() -> bool {
    true
}

/// Immutable definition of a scheduled workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub id: JobId,
    pub steps: Vec<StepDef>,
    pub trigger: TriggerSpec,
    /// Wait applied to every step that does not carry its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait: Option<WaitSpec>,
    /// Maximum number of live instances.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,
    #[serde(default)]
    pub on_surpass: SurpassBehaviour,
    /// Inactive descriptors are stored but never started.
    #[serde(default = "default_active")]
    pub active: bool,
}

impl JobDescriptor {
    pub fn new(id: impl Into<JobId>, trigger: TriggerSpec, steps: Vec<StepDef>) -> Self {
        Self {
            id: id.into(),
            steps,
            trigger,
            wait: None,
            concurrency: 1,
            on_surpass: SurpassBehaviour::Skip,
            active: true,
        }
        .normalized()
    }

    /// Single command step with an optional wait, the common shape.
    pub fn single(
        id: impl Into<JobId>,
        command: impl Into<String>,
        timeout: Duration,
        trigger: TriggerSpec,
        wait: Option<WaitSpec>,
    ) -> Self {
        let mut job = Self::new(
            id,
            trigger,
            vec![StepDef::new(StepAction::command(command), timeout)],
        );
        job.wait = wait;
        job
    }

    pub fn with_wait(mut self, wait: WaitSpec) -> Self {
        self.wait = Some(wait);
        self
    }

    pub fn with_concurrency(mut self, concurrency: u32, on_surpass: SurpassBehaviour) -> Self {
        self.concurrency = concurrency;
        self.on_surpass = on_surpass;
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Fill in default step names.
    pub fn normalized(mut self) -> Self {
        for (i, step) in self.steps.iter_mut().enumerate() {
            if step.name.trim().is_empty() {
                step.name = format!("step-{}", i + 1);
            }
        }
        self
    }

    pub fn step(&self, index: usize) -> Option<&StepDef> {
        self.steps.get(index)
    }

    /// The wait in effect for `index`: the step's own, else the descriptor default.
    pub fn wait_for(&self, index: usize) -> Option<&WaitSpec> {
        self.steps
            .get(index)
            .and_then(|s| s.wait.as_ref())
            .or(self.wait.as_ref())
    }

    pub fn is_last_step(&self, index: usize) -> bool {
        index + 1 >= self.steps.len()
    }

    /// Check the descriptor before it is accepted.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let job = self.id.as_str();
        if job.trim().is_empty() {
            return Err(ValidationError::EmptyId);
        }
        if self.steps.is_empty() {
            return Err(ValidationError::NoSteps {
                job: job.to_string(),
            });
        }
        if self.concurrency == 0 {
            return Err(ValidationError::ZeroConcurrency {
                job: job.to_string(),
            });
        }

        let trigger_err = |source| ValidationError::Trigger {
            job: job.to_string(),
            source,
        };
        self.trigger.validate().map_err(trigger_err)?;
        if let Some(wait) = &self.wait {
            check_wait(job, None, wait)?;
        }

        let mut seen = HashSet::new();
        for step in &self.steps {
            if !seen.insert(step.name.as_str()) {
                return Err(ValidationError::DuplicateStep {
                    job: job.to_string(),
                    step: step.name.clone(),
                });
            }
            if step.timeout.is_zero() {
                return Err(ValidationError::ZeroStepTimeout {
                    job: job.to_string(),
                    step: step.name.clone(),
                });
            }
            if let StepAction::ExecuteCommand { command } = &step.action {
                if command.trim().is_empty() {
                    return Err(ValidationError::EmptyCommand {
                        job: job.to_string(),
                        step: step.name.clone(),
                    });
                }
            }
            if let Some(wait) = &step.wait {
                check_wait(job, Some(&step.name), wait)?;
            }
        }
        Ok(())
    }
}

fn check_wait(job: &str, step: Option<&str>, wait: &WaitSpec) -> Result<(), ValidationError> {
    if wait.timeout.is_zero() {
        return Err(ValidationError::ZeroWaitTimeout {
            job: job.to_string(),
            step: step.map(str::to_string),
        });
    }
    wait.trigger
        .validate()
        .map_err(|source| ValidationError::Trigger {
            job: job.to_string(),
            source,
        })
}

/// A descriptor rejected at definition time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("job id must not be empty")]
    EmptyId,

    #[error("job '{job}' has no steps")]
    NoSteps { job: String },

    #[error("job '{job}' step '{step}' has a zero timeout")]
    ZeroStepTimeout { job: String, step: String },

    #[error("job '{job}' has a zero wait timeout{}", .step.as_ref().map(|s| format!(" on step '{}'", s)).unwrap_or_default())]
    ZeroWaitTimeout { job: String, step: Option<String> },

    #[error("job '{job}' allows zero concurrent runs")]
    ZeroConcurrency { job: String },

    #[error("job '{job}' has duplicate step '{step}'")]
    DuplicateStep { job: String, step: String },

    #[error("job '{job}' step '{step}' has an empty command")]
    EmptyCommand { job: String, step: String },

    #[error("job '{job}': {source}")]
    Trigger {
        job: String,
        source: TriggerConfigError,
    },
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
