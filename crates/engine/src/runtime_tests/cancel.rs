// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operator cancellation

use super::*;
use tally_core::SurpassBehaviour;

#[tokio::test]
async fn cancel_running_stops_work() {
    let mut ctx = setup();
    ctx.define(command_job("build", "push")).await;
    let id = start_one(&mut ctx, "build").await;
    let handle = ctx.actions.last_handle().unwrap();

    assert_eq!(ctx.runtime.cancel(&id).await.unwrap(), CancelOutcome::Accepted);

    assert_eq!(ctx.stored(&id).await.status, TaskStatus::Cancelled);
    assert_eq!(ctx.actions.cancelled(), vec![handle.clone()]);
    assert!(!ctx.runtime.scheduler().has_timers());

    // The executor's late report changes nothing
    ctx.complete(&handle, true).await;
    assert_eq!(ctx.stored(&id).await.status, TaskStatus::Cancelled);
}

#[tokio::test]
async fn cancel_waiting_drops_deadline() {
    let mut ctx = setup();
    ctx.define(waiting_job("deploy", "push", "approved", 30)).await;
    let id = start_one(&mut ctx, "deploy").await;
    ctx.complete_last().await;

    assert_eq!(ctx.runtime.cancel(&id).await.unwrap(), CancelOutcome::Accepted);

    assert_eq!(ctx.stored(&id).await.status, TaskStatus::Cancelled);
    assert!(ctx.actions.cancelled().is_empty());
    assert!(!ctx.runtime.scheduler().is_set(&TimerId::wait_deadline(&id)));
}

#[tokio::test]
async fn cancel_queued_start() {
    let mut ctx = setup();
    ctx.define(command_job("build", "push").with_concurrency(1, SurpassBehaviour::Wait))
        .await;
    start_one(&mut ctx, "build").await;
    let StartOutcome::Queued(queued) = ctx.runtime.trigger(&JobId::new("build")).await.unwrap()
    else {
        panic!("expected a queued start");
    };

    assert_eq!(ctx.runtime.cancel(&queued).await.unwrap(), CancelOutcome::Accepted);
    ctx.complete_last().await;

    assert_eq!(ctx.stored(&queued).await.status, TaskStatus::Cancelled);
    assert_eq!(ctx.dispatched().len(), 1, "cancelled start never runs");
}

#[tokio::test]
async fn cancel_finished_is_already_terminal() {
    let mut ctx = setup();
    ctx.define(command_job("build", "push")).await;
    let id = start_one(&mut ctx, "build").await;
    ctx.complete_last().await;

    assert_eq!(ctx.runtime.cancel(&id).await.unwrap(), CancelOutcome::AlreadyTerminal);
    assert_eq!(ctx.stored(&id).await.status, TaskStatus::Done);
}

#[tokio::test]
async fn cancel_twice() {
    let mut ctx = setup();
    ctx.define(command_job("build", "push")).await;
    let id = start_one(&mut ctx, "build").await;

    assert_eq!(ctx.runtime.cancel(&id).await.unwrap(), CancelOutcome::Accepted);
    assert_eq!(ctx.runtime.cancel(&id).await.unwrap(), CancelOutcome::AlreadyTerminal);
    assert_eq!(ctx.actions.cancelled().len(), 1);
}

#[tokio::test]
async fn cancel_unknown_is_not_found() {
    let mut ctx = setup();
    assert_eq!(
        ctx.runtime.cancel(&TaskId::new("nope")).await.unwrap(),
        CancelOutcome::NotFound
    );
}

#[tokio::test]
async fn cancel_lookup_failure_is_an_error() {
    let mut ctx = setup();
    ctx.tasks.fail_reads(true);

    let err = ctx.runtime.cancel(&TaskId::new("gone")).await.unwrap_err();
    assert!(matches!(err, RuntimeError::Store(_)), "{err}");
}

#[tokio::test]
async fn live_cancel_does_not_need_a_lookup() {
    let mut ctx = setup();
    ctx.define(command_job("build", "push")).await;
    let id = start_one(&mut ctx, "build").await;
    ctx.tasks.fail_reads(true);

    assert_eq!(ctx.runtime.cancel(&id).await.unwrap(), CancelOutcome::Accepted);
}

#[yare::parameterized(
    accepted         = { CancelOutcome::Accepted, 0 },
    not_found        = { CancelOutcome::NotFound, 1 },
    already_terminal = { CancelOutcome::AlreadyTerminal, 2 },
)]
fn outcome_codes_are_stable(outcome: CancelOutcome, code: u8) {
    assert_eq!(outcome.code(), code);
}
