// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effects represent side effects the engine needs performed.
//!
//! Runtime handlers decide; the effect executor acts. Persistence is not an
//! effect: handlers persist an instance before returning the effects that
//! depend on it.

use crate::event::Event;
use crate::job::{JobId, StepAction};
use crate::task::TaskId;
use crate::time_fmt::duration_serde;
use crate::timer::TimerId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Effect {
    /// Publish an event on the bus
    Emit { event: Event },

    /// Hand a step's action to the executor
    Dispatch {
        task_id: TaskId,
        job_id: JobId,
        step: usize,
        action: StepAction,
    },

    /// Ask the executor to stop in-flight work (best effort)
    CancelWork { task_id: TaskId, handle: String },

    SetTimer {
        id: TimerId,
        #[serde(with = "duration_serde")]
        duration: Duration,
    },

    CancelTimer { id: TimerId },

    /// Raise an operator-visible alert
    Notify {
        title: String,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task_id: Option<TaskId>,
    },
}

impl crate::traced::TracedEffect for Effect {
    fn name(&self) -> &'static str {
        match self {
            Effect::Emit { .. } => "emit",
            Effect::Dispatch { .. } => "dispatch",
            Effect::CancelWork { .. } => "cancel_work",
            Effect::SetTimer { .. } => "set_timer",
            Effect::CancelTimer { .. } => "cancel_timer",
            Effect::Notify { .. } => "notify",
        }
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        match self {
            Effect::Emit { event } => vec![("event", event.log_summary())],
            Effect::Dispatch {
                task_id,
                job_id,
                step,
                action,
            } => vec![
                ("task_id", task_id.to_string()),
                ("job_id", job_id.to_string()),
                ("step", step.to_string()),
                ("action", action.kind().to_string()),
            ],
            Effect::CancelWork { task_id, handle } => vec![
                ("task_id", task_id.to_string()),
                ("handle", handle.clone()),
            ],
            Effect::SetTimer { id, duration } => vec![
                ("timer_id", id.to_string()),
                ("duration_ms", duration.as_millis().to_string()),
            ],
            Effect::CancelTimer { id } => vec![("timer_id", id.to_string())],
            Effect::Notify { title, task_id, .. } => {
                let mut fields = vec![("title", title.clone())];
                if let Some(id) = task_id {
                    fields.push(("task_id", id.to_string()));
                }
                fields
            }
        }
    }
}

#[cfg(test)]
#[path = "effect_tests.rs"]
mod tests;
