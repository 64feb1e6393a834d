// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Action executors.
//!
//! The engine hands each step's action to an [`ActionExecutor`]. Dispatch
//! returns as soon as the work is accepted; the outcome arrives later as a
//! `task-action-completed` event on the bus carrying the same handle.

mod collect;
mod routing;
mod shell;

pub use collect::CollectExecutor;
pub use routing::RoutingExecutor;
pub use shell::{ShellConfig, ShellExecutor};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{ExecutorCall, FakeExecutor};

use async_trait::async_trait;
use tally_core::{JobId, StepAction, TaskId};
use thiserror::Error;

tally_core::define_id! {
    /// Opaque reference to one accepted dispatch.
    pub struct ActionHandle;
}

/// What the engine asks an executor to run.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRequest {
    pub task_id: TaskId,
    pub job_id: JobId,
    pub step: usize,
    pub action: StepAction,
}

/// Errors from dispatch
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("dispatch rejected: {0}")]
    Rejected(String),
    #[error("{0} actions are not supported by this executor")]
    Unsupported(&'static str),
}

/// Runs step actions out of band.
#[async_trait]
pub trait ActionExecutor: Clone + Send + Sync + 'static {
    /// Accept `request` and return its handle without waiting for the work.
    async fn dispatch(&self, request: DispatchRequest) -> Result<ActionHandle, DispatchError>;

    /// Stop in-flight work for `handle`. Unknown handles are ignored.
    async fn cancel(&self, handle: &ActionHandle);
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
