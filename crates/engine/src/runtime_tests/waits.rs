// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Waits: the triggered path, the timeout path, and their race

use super::*;
use tally_core::{StepAction, StepDef, TriggerSpec, WaitSpec};

const WAIT_SECS: u64 = 30;

/// Start `deploy` and complete its action so it holds in `Waiting`.
async fn waiting(ctx: &mut TestContext) -> TaskId {
    ctx.define(waiting_job("deploy", "push", "approved", WAIT_SECS))
        .await;
    let id = start_one(ctx, "deploy").await;
    ctx.complete_last().await;
    assert_eq!(ctx.status(&id), Some(TaskStatus::Waiting));
    id
}

#[tokio::test]
async fn successful_action_enters_wait() {
    let mut ctx = setup();
    let id = waiting(&mut ctx).await;

    let stored = ctx.stored(&id).await;
    assert_eq!(stored.status, TaskStatus::Waiting);
    assert!(stored.wait_deadline_ms.is_some());
    assert!(ctx.runtime.scheduler().is_set(&TimerId::wait_deadline(&id)));
    assert!(!ctx.runtime.scheduler().is_set(&TimerId::step_timeout(&id)));
}

#[tokio::test]
async fn wait_trigger_advances() {
    let mut ctx = setup();
    let id = waiting(&mut ctx).await;

    ctx.fire("approved").await;

    let stored = ctx.stored(&id).await;
    assert_eq!(stored.status, TaskStatus::Done);
    assert_eq!(stored.timed_out_waits, 0);
    assert_eq!(
        stored.results[0].wait,
        Some(WaitOutcome::Triggered {
            kind: "approved".into()
        })
    );
    assert!(!ctx.runtime.scheduler().has_timers());
}

#[tokio::test]
async fn wait_timeout_finishes_timed_out() {
    let mut ctx = setup();
    let id = waiting(&mut ctx).await;

    ctx.advance(Duration::from_secs(WAIT_SECS + 1)).await;

    let stored = ctx.stored(&id).await;
    assert_eq!(stored.status, TaskStatus::TimedOut);
    assert_eq!(stored.timed_out_waits, 1);
    assert_eq!(stored.error, None);
}

#[tokio::test]
async fn trigger_before_tick_wins_race() {
    let mut ctx = setup();
    let id = waiting(&mut ctx).await;

    // Deadline passes but no tick has run yet
    ctx.clock.advance(Duration::from_secs(WAIT_SECS + 5));
    ctx.fire("approved").await;
    ctx.runtime.tick().await;

    let stored = ctx.stored(&id).await;
    assert_eq!(stored.status, TaskStatus::Done);
    assert_eq!(stored.timed_out_waits, 0);
}

#[tokio::test]
async fn tick_before_trigger_wins_race() {
    let mut ctx = setup();
    let id = waiting(&mut ctx).await;

    ctx.advance(Duration::from_secs(WAIT_SECS + 5)).await;
    ctx.fire("approved").await;

    let stored = ctx.stored(&id).await;
    assert_eq!(stored.status, TaskStatus::TimedOut);
    assert_eq!(stored.results.len(), 1);
}

#[tokio::test]
async fn wait_trigger_while_running_is_ignored() {
    let mut ctx = setup();
    ctx.define(waiting_job("deploy", "push", "approved", WAIT_SECS))
        .await;
    let id = start_one(&mut ctx, "deploy").await;

    ctx.fire("approved").await;
    ctx.complete_last().await;

    assert_eq!(ctx.status(&id), Some(TaskStatus::Waiting));
}

#[tokio::test]
async fn wait_mid_job_resumes_next_step() {
    let mut ctx = setup();
    let job = multi_step_job("pipe", "push", 2).with_wait(WaitSpec::new(
        TriggerSpec::event("approved"),
        Duration::from_secs(WAIT_SECS),
    ));
    ctx.define(job).await;
    let id = start_one(&mut ctx, "pipe").await;

    ctx.complete_last().await;
    ctx.advance(Duration::from_secs(WAIT_SECS + 1)).await;

    // Timeout path continues with the next step
    assert_eq!(ctx.status(&id), Some(TaskStatus::Running));
    assert_eq!(ctx.dispatched().len(), 2);

    // and the run still reports the degraded wait at the end
    ctx.complete_last().await;
    ctx.fire("approved").await;
    let stored = ctx.stored(&id).await;
    assert_eq!(stored.status, TaskStatus::TimedOut);
    assert_eq!(stored.timed_out_waits, 1);
}

#[tokio::test]
async fn step_wait_overrides_job_default() {
    let mut ctx = setup();
    let steps = vec![
        StepDef::new(StepAction::command("make"), STEP_TIMEOUT).with_wait(WaitSpec::new(
            TriggerSpec::event("built"),
            Duration::from_secs(5),
        )),
    ];
    let job = JobDescriptor::new("build", TriggerSpec::event("push"), steps).with_wait(
        WaitSpec::new(TriggerSpec::event("approved"), Duration::from_secs(60)),
    );
    ctx.define(job).await;
    let id = start_one(&mut ctx, "build").await;
    ctx.complete_last().await;

    ctx.fire("approved").await;
    assert_eq!(ctx.status(&id), Some(TaskStatus::Waiting));

    ctx.fire("built").await;
    assert_eq!(ctx.stored(&id).await.status, TaskStatus::Done);
}

#[tokio::test]
async fn one_event_releases_every_matching_wait() {
    let mut ctx = setup();
    ctx.define(waiting_job("a", "push", "approved", WAIT_SECS)).await;
    ctx.define(waiting_job("b", "push", "approved", WAIT_SECS)).await;
    ctx.fire("push").await;
    for (handle, _) in ctx.actions.dispatched() {
        ctx.complete(&handle, true).await;
    }

    ctx.fire("approved").await;

    assert!(ctx.runtime.live_tasks().next().is_none());
    for job in ["a", "b"] {
        assert_eq!(ctx.stored_for(job).await[0].status, TaskStatus::Done);
    }
}

#[tokio::test]
async fn own_completion_does_not_end_the_wait_it_starts() {
    let mut ctx = setup();
    ctx.define(waiting_job("relay", "push", "task-action-completed", WAIT_SECS))
        .await;
    ctx.define(command_job("other", "poke")).await;
    let id = start_one(&mut ctx, "relay").await;

    ctx.complete_last().await;
    assert_eq!(ctx.status(&id), Some(TaskStatus::Waiting));

    // A later completion is a fresh stimulus and releases the wait
    ctx.fire("poke").await;
    ctx.complete_last().await;

    let stored = ctx.stored(&id).await;
    assert_eq!(stored.status, TaskStatus::Done);
    assert_eq!(
        stored.results[0].wait,
        Some(WaitOutcome::Triggered {
            kind: "task-action-completed".into()
        })
    );
}
