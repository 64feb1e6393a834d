// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Triggers: when a job starts and when a waiting step continues.

use crate::event::Event;
use crate::schedule::{Schedule, TriggerConfigError};
use crate::time_fmt::duration_serde;
use chrono::{DateTime, Duration as ChronoDuration, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Longest span of wall-clock seconds replayed after a late tick.
pub const MAX_CATCH_UP: Duration = Duration::from_secs(3600);

/// Condition that starts or continues execution.
///
/// Serializes as `{"type": "event", "name": ...}` or
/// `{"type": "time", "schedule": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerSpec {
    /// Fires when a bus event of exactly this kind is observed.
    Event { name: String },
    /// Fires on every wall-clock second that satisfies the schedule.
    Time { schedule: Schedule },
}

impl TriggerSpec {
    pub fn event(name: impl Into<String>) -> Self {
        TriggerSpec::Event { name: name.into() }
    }

    pub fn time(expr: &str) -> Result<Self, TriggerConfigError> {
        Ok(TriggerSpec::Time {
            schedule: Schedule::parse(expr)?,
        })
    }

    pub fn validate(&self) -> Result<(), TriggerConfigError> {
        match self {
            TriggerSpec::Event { name } if name.trim().is_empty() => {
                Err(TriggerConfigError::EmptyEventName)
            }
            _ => Ok(()),
        }
    }

    /// Whether this trigger fires for `stimulus`.
    pub fn matches(&self, stimulus: &Stimulus<'_>) -> bool {
        match (self, stimulus) {
            (TriggerSpec::Event { name }, Stimulus::Event(event)) => event.kind == *name,
            (TriggerSpec::Time { schedule }, Stimulus::Tick(at)) => schedule.matches(at),
            _ => false,
        }
    }
}

impl fmt::Display for TriggerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerSpec::Event { name } => write!(f, "event:{}", name),
            TriggerSpec::Time { schedule } => write!(f, "time:{}", schedule),
        }
    }
}

/// "Hold at this step until `trigger` fires, but continue once `timeout` elapses."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitSpec {
    pub trigger: TriggerSpec,
    #[serde(with = "duration_serde")]
    pub timeout: Duration,
}

impl WaitSpec {
    pub fn new(trigger: TriggerSpec, timeout: Duration) -> Self {
        Self { trigger, timeout }
    }
}

/// Something a trigger can be evaluated against.
#[derive(Debug, Clone, Copy)]
pub enum Stimulus<'a> {
    Event(&'a Event),
    /// A wall-clock second, truncated.
    Tick(DateTime<Utc>),
}

/// Whole wall-clock seconds in `(previous, now]`, oldest first.
///
/// Replays at most [`MAX_CATCH_UP`] so a resumed process does not walk an
/// unbounded backlog.
pub fn catch_up_ticks(
    previous: DateTime<Utc>,
    now: DateTime<Utc>,
) -> impl Iterator<Item = DateTime<Utc>> {
    let now = now.with_nanosecond(0).unwrap_or(now);
    let previous = previous.with_nanosecond(0).unwrap_or(previous);
    let cap = MAX_CATCH_UP.as_secs() as i64;
    let span = (now - previous).num_seconds().clamp(0, cap);
    let first = now - ChronoDuration::seconds(span);
    (1..=span).map(move |i| first + ChronoDuration::seconds(i))
}

#[cfg(test)]
#[path = "trigger_tests.rs"]
mod tests;
