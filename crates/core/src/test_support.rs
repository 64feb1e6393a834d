// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{
    Event, JobDescriptor, StepAction, StepDef, TaskId, TaskInstance, TriggerSpec, WaitSpec,
};
use std::time::Duration;

// ── Descriptor builders ─────────────────────────────────────────────────────

/// Single command step with a 10s step timeout, started by event `trigger`.
pub fn command_job(id: &str, trigger: &str) -> JobDescriptor {
    JobDescriptor::single(
        id,
        format!("echo {}", id),
        Duration::from_secs(10),
        TriggerSpec::event(trigger),
        None,
    )
}

/// Like [`command_job`] with a wait on event `wait_on` for `wait_secs`.
pub fn waiting_job(id: &str, trigger: &str, wait_on: &str, wait_secs: u64) -> JobDescriptor {
    command_job(id, trigger).with_wait(WaitSpec::new(
        TriggerSpec::event(wait_on),
        Duration::from_secs(wait_secs),
    ))
}

/// Descriptor with `n` command steps named `s1..sn`.
pub fn multi_step_job(id: &str, trigger: &str, n: usize) -> JobDescriptor {
    let steps = (1..=n)
        .map(|i| {
            StepDef::new(
                StepAction::command(format!("echo {}", i)),
                Duration::from_secs(10),
            )
            .named(format!("s{}", i))
        })
        .collect();
    JobDescriptor::new(id, TriggerSpec::event(trigger), steps)
}

// ── Instance and event factories ────────────────────────────────────────────

pub fn pending_task(id: &str, job_id: &str) -> TaskInstance {
    TaskInstance::new(TaskId::new(id), job_id.into(), 1_000_000)
}

pub fn bare_event(kind: &str) -> Event {
    Event::new(kind, serde_json::Value::Null)
}
