// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Tally orchestration engine: turns job descriptors into running task
//! instances and drives them to completion.

mod engine;
mod error;
mod executor;
mod handle;
mod retry;
mod runtime;
mod scheduler;

#[cfg(test)]
mod test_helpers;

pub use engine::Engine;
pub use error::RuntimeError;
pub use executor::{Executor, Feedback};
pub use handle::{CancelOutcome, EngineHandle, TaskFilter};
pub use retry::RetryPolicy;
pub use runtime::{
    Runtime, RuntimeConfig, RuntimeDeps, SharedStore, StartOnSubscriber, StartOutcome,
};
pub use scheduler::Scheduler;
