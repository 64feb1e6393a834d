// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime tests

mod archive;
mod cancel;
mod errors;
mod jobs;
mod recovery;
mod start;
mod steps;
mod subscriber;
mod surpass;
mod waits;

use super::*;
use crate::handle::CancelOutcome;
use crate::test_helpers::{restart, setup, setup_with, test_config, TestContext};
use crate::RuntimeError;
use tally_core::test_support::{command_job, multi_step_job, waiting_job};
use tally_core::WaitOutcome;

const STEP_TIMEOUT: Duration = Duration::from_secs(10);

/// Start `job` through its `push` trigger and return the new instance.
async fn start_one(ctx: &mut TestContext, job: &str) -> TaskId {
    ctx.fire("push").await;
    ctx.live_for(job)
        .pop()
        .unwrap_or_else(|| panic!("{job} did not start"))
}
