// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task instances and their state machine.
//!
//! A task instance is one execution of a job descriptor. It is created
//! `Pending`, runs each step in order, may hold at a step in `Waiting`
//! until a wait trigger fires or its deadline passes, and ends in one of
//! the terminal states. Only the engine mutates instances; every method
//! here validates its move against [`TaskStatus::can_transition_to`].

use crate::job::JobId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

crate::define_id! {
    /// Generated identifier of one task run.
    pub struct TaskId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Waiting,
    Done,
    Failed,
    /// Every step ran, but at least one wait continued via its timeout.
    TimedOut,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Done | TaskStatus::Failed | TaskStatus::TimedOut | TaskStatus::Cancelled
        )
    }

    /// The transition table.
    pub fn can_transition_to(self, to: TaskStatus) -> bool {
        use TaskStatus::*;
        match (self, to) {
            (from, Cancelled) => !from.is_terminal(),
            (Pending, Running) => true,
            (Running, Waiting | Done | Failed | TimedOut) => true,
            (Waiting, Running | Done | TimedOut) => true,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Waiting => "waiting",
            TaskStatus::Done => "done",
            TaskStatus::Failed => "failed",
            TaskStatus::TimedOut => "timed_out",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("task {task}: illegal transition {from} -> {to}")]
pub struct TransitionError {
    pub task: TaskId,
    pub from: TaskStatus,
    pub to: TaskStatus,
}

/// How a step's action ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "message", rename_all = "snake_case")]
pub enum StepOutcome {
    Completed,
    Failed(String),
    Cancelled,
}

/// How a step's wait ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "via", rename_all = "snake_case")]
pub enum WaitOutcome {
    /// The wait trigger matched a stimulus of this kind.
    Triggered { kind: String },
    TimedOut,
}

/// Record of one finished step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    pub step: usize,
    pub name: String,
    pub started_at_ms: u64,
    pub finished_at_ms: u64,
    pub outcome: StepOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait: Option<WaitOutcome>,
}

/// What the engine should do after an instance moved forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Hold for the wait trigger or its deadline.
    Waiting,
    /// Dispatch the step at this index.
    NextStep(usize),
    /// The instance reached a terminal status.
    Finished(TaskStatus),
}

/// One execution of a job descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInstance {
    pub id: TaskId,
    pub job_id: JobId,
    /// Index of the current step.
    pub step: usize,
    pub status: TaskStatus,
    pub created_at_ms: u64,
    #[serde(default)]
    pub started_at_ms: Option<u64>,
    #[serde(default)]
    pub step_started_at_ms: Option<u64>,
    pub updated_at_ms: u64,
    #[serde(default)]
    pub finished_at_ms: Option<u64>,
    #[serde(default)]
    pub step_deadline_ms: Option<u64>,
    #[serde(default)]
    pub wait_deadline_ms: Option<u64>,
    /// Executor handle of the in-flight action.
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub results: Vec<StepResult>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub timed_out_waits: u32,
}

impl TaskInstance {
    pub fn new(id: TaskId, job_id: JobId, now_ms: u64) -> Self {
        Self {
            id,
            job_id,
            step: 0,
            status: TaskStatus::Pending,
            created_at_ms: now_ms,
            started_at_ms: None,
            step_started_at_ms: None,
            updated_at_ms: now_ms,
            finished_at_ms: None,
            step_deadline_ms: None,
            wait_deadline_ms: None,
            handle: None,
            results: Vec::new(),
            error: None,
            timed_out_waits: 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn transition(&mut self, to: TaskStatus, now_ms: u64) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(to) {
            return Err(TransitionError {
                task: self.id.clone(),
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.updated_at_ms = now_ms;
        if to.is_terminal() {
            self.finished_at_ms = Some(now_ms);
            self.step_deadline_ms = None;
            self.wait_deadline_ms = None;
            self.handle = None;
        }
        Ok(())
    }

    fn arm_step(&mut self, timeout: Duration, now_ms: u64) {
        self.step_started_at_ms = Some(now_ms);
        self.step_deadline_ms = Some(now_ms.saturating_add(timeout.as_millis() as u64));
        self.wait_deadline_ms = None;
        self.handle = None;
    }

    fn push_result(&mut self, name: &str, outcome: StepOutcome, now_ms: u64) {
        self.results.push(StepResult {
            step: self.step,
            name: name.to_string(),
            started_at_ms: self.step_started_at_ms.unwrap_or(now_ms),
            finished_at_ms: now_ms,
            outcome,
            wait: None,
        });
    }

    /// `Pending -> Running` at step 0.
    pub fn begin(&mut self, step_timeout: Duration, now_ms: u64) -> Result<(), TransitionError> {
        self.transition(TaskStatus::Running, now_ms)?;
        self.started_at_ms = Some(now_ms);
        self.step = 0;
        self.arm_step(step_timeout, now_ms);
        Ok(())
    }

    /// Re-arm the current step after a restart (the action is re-dispatched).
    pub fn restart_step(&mut self, step_timeout: Duration, now_ms: u64) {
        self.arm_step(step_timeout, now_ms);
        self.updated_at_ms = now_ms;
    }

    /// Start the step at `index` while already `Running`.
    pub fn enter_step(&mut self, index: usize, step_timeout: Duration, now_ms: u64) {
        self.step = index;
        self.arm_step(step_timeout, now_ms);
        self.updated_at_ms = now_ms;
    }

    /// The executor accepted the current step's action.
    pub fn dispatched(&mut self, handle: impl Into<String>, now_ms: u64) {
        self.handle = Some(handle.into());
        self.updated_at_ms = now_ms;
    }

    /// The current step's action completed successfully.
    ///
    /// With a wait the instance moves to `Waiting`; otherwise it advances.
    pub fn action_succeeded(
        &mut self,
        step_name: &str,
        wait_timeout: Option<Duration>,
        is_last: bool,
        now_ms: u64,
    ) -> Result<Progress, TransitionError> {
        if self.status != TaskStatus::Running {
            return Err(TransitionError {
                task: self.id.clone(),
                from: self.status,
                to: TaskStatus::Waiting,
            });
        }
        self.push_result(step_name, StepOutcome::Completed, now_ms);
        self.handle = None;
        self.step_deadline_ms = None;

        match wait_timeout {
            Some(timeout) => {
                self.transition(TaskStatus::Waiting, now_ms)?;
                self.wait_deadline_ms = Some(now_ms.saturating_add(timeout.as_millis() as u64));
                Ok(Progress::Waiting)
            }
            None => self.advance(is_last, now_ms),
        }
    }

    /// The current step's wait ended via `outcome`.
    pub fn wait_ended(
        &mut self,
        outcome: WaitOutcome,
        is_last: bool,
        now_ms: u64,
    ) -> Result<Progress, TransitionError> {
        if self.status != TaskStatus::Waiting {
            return Err(TransitionError {
                task: self.id.clone(),
                from: self.status,
                to: TaskStatus::Running,
            });
        }
        if outcome == WaitOutcome::TimedOut {
            self.timed_out_waits += 1;
        }
        if let Some(last) = self.results.last_mut() {
            last.wait = Some(outcome);
        }
        self.wait_deadline_ms = None;
        self.advance(is_last, now_ms)
    }

    fn advance(&mut self, is_last: bool, now_ms: u64) -> Result<Progress, TransitionError> {
        if is_last {
            let status = if self.timed_out_waits > 0 {
                TaskStatus::TimedOut
            } else {
                TaskStatus::Done
            };
            self.transition(status, now_ms)?;
            return Ok(Progress::Finished(status));
        }
        if self.status == TaskStatus::Waiting {
            self.transition(TaskStatus::Running, now_ms)?;
        }
        Ok(Progress::NextStep(self.step + 1))
    }

    /// The current step failed: action error, rejected dispatch, or step timeout.
    pub fn fail(
        &mut self,
        step_name: &str,
        error: impl Into<String>,
        now_ms: u64,
    ) -> Result<(), TransitionError> {
        let error = error.into();
        self.transition(TaskStatus::Failed, now_ms)?;
        self.push_result(step_name, StepOutcome::Failed(error.clone()), now_ms);
        self.error = Some(error);
        Ok(())
    }

    /// Mark failed from any non-terminal status.
    ///
    /// Only for the case where the instance's own state can no longer be
    /// persisted; ordinary failures go through [`TaskInstance::fail`].
    pub fn force_fail(&mut self, error: impl Into<String>, now_ms: u64) {
        if self.is_terminal() {
            return;
        }
        self.status = TaskStatus::Failed;
        self.error = Some(error.into());
        self.updated_at_ms = now_ms;
        self.finished_at_ms = Some(now_ms);
        self.step_deadline_ms = None;
        self.wait_deadline_ms = None;
        self.handle = None;
    }

    /// Cancel. Returns the in-flight handle, if any, so the caller can ask
    /// the executor to stop it.
    pub fn cancel(
        &mut self,
        step_name: &str,
        now_ms: u64,
    ) -> Result<Option<String>, TransitionError> {
        let was_running = self.status == TaskStatus::Running;
        let handle = self.handle.clone();
        self.transition(TaskStatus::Cancelled, now_ms)?;
        if was_running {
            self.push_result(step_name, StepOutcome::Cancelled, now_ms);
        }
        Ok(handle)
    }

    /// Milliseconds until `deadline_ms`, zero if already passed.
    pub fn remaining(deadline_ms: Option<u64>, now_ms: u64) -> Option<Duration> {
        deadline_ms.map(|d| Duration::from_millis(d.saturating_sub(now_ms)))
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
