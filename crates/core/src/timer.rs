// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timer identifier type for tracking scheduled timers.
//!
//! Each live task instance owns at most one timer at a time: the step
//! deadline while its action runs, or the wait deadline while it holds.

use crate::task::TaskId;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

const STEP_PREFIX: &str = "step-timeout:";
const WAIT_PREFIX: &str = "wait-deadline:";

/// Unique identifier for a timer instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerId(pub String);

/// What an elapsed timer means for its task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    StepTimeout,
    WaitDeadline,
}

impl TimerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Timer ID for the step deadline of a task.
    pub fn step_timeout(task_id: &TaskId) -> Self {
        Self::new(format!("{}{}", STEP_PREFIX, task_id))
    }

    /// Timer ID for the wait deadline of a task.
    pub fn wait_deadline(task_id: &TaskId) -> Self {
        Self::new(format!("{}{}", WAIT_PREFIX, task_id))
    }

    /// Split into kind and task id. `None` for timers this crate did not mint.
    pub fn parse(&self) -> Option<(TimerKind, TaskId)> {
        if let Some(rest) = self.0.strip_prefix(STEP_PREFIX) {
            Some((TimerKind::StepTimeout, TaskId::new(rest)))
        } else {
            self.0
                .strip_prefix(WAIT_PREFIX)
                .map(|rest| (TimerKind::WaitDeadline, TaskId::new(rest)))
        }
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TimerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl PartialEq<&str> for TimerId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Borrow<str> for TimerId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[path = "timer_tests.rs"]
mod tests;
