// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine runtime

use tally_core::{JobId, TaskId, TransitionError, ValidationError};
use tally_storage::StoreError;
use thiserror::Error;

/// Errors that can occur in the runtime
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("invalid job: {0}")]
    Validation(#[from] ValidationError),
    #[error("job not found: {0}")]
    JobNotFound(JobId),
    #[error("job {0} is inactive")]
    JobInactive(JobId),
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),
    #[error("engine is not running")]
    Closed,
}
