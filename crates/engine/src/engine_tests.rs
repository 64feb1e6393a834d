// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::handle::{CancelOutcome, TaskFilter};
use crate::test_helpers::{setup, TestContext};
use crate::StartOutcome;
use tally_adapters::FakeExecutor;
use tally_core::test_support::{bare_event, command_job};
use tally_core::{EventBus, JobId, TaskStatus};
use tokio::task::JoinHandle;

struct Running {
    handle: EngineHandle,
    bus: EventBus,
    actions: FakeExecutor,
    join: JoinHandle<()>,
}

fn spawn(ctx: TestContext) -> Running {
    let TestContext {
        runtime,
        actions,
        bus,
        ..
    } = ctx;
    let (engine, handle) = Engine::new(runtime, Duration::from_secs(1));
    let join = tokio::spawn(engine.run());
    Running {
        handle,
        bus,
        actions,
        join,
    }
}

/// Poll until `check` holds; the loop runs on its own task.
async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..500 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

#[tokio::test]
async fn commands_round_trip_through_the_loop() {
    let running = spawn(setup());
    let handle = running.handle.clone();

    let ids = handle
        .define_jobs(vec![command_job("build", "push")])
        .await
        .unwrap();
    assert_eq!(ids, vec![JobId::new("build")]);
    assert_eq!(handle.list_jobs().await.unwrap().len(), 1);

    let StartOutcome::Started(id) = handle.trigger(&JobId::new("build")).await.unwrap() else {
        panic!("expected a start");
    };
    let task = handle.get_task(&id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Running);

    assert_eq!(handle.cancel(&id).await.unwrap(), CancelOutcome::Accepted);
    assert_eq!(
        handle.get_task(&id).await.unwrap().unwrap().status,
        TaskStatus::Cancelled
    );

    handle.shutdown().await.unwrap();
    running.join.await.unwrap();
}

#[tokio::test]
async fn bus_events_drive_the_loop() {
    let running = spawn(setup());
    let handle = running.handle.clone();
    handle
        .define_jobs(vec![command_job("build", "push")])
        .await
        .unwrap();

    running.bus.publish(bare_event("push")).unwrap();
    let filter = TaskFilter::for_job("build");
    let (h, f) = (&handle, &filter);
    eventually(move || async move { h.list_tasks(f).await.unwrap().len() == 1 }).await;

    let task_id = handle.list_tasks(&filter).await.unwrap()[0].id.clone();
    let actions = &running.actions;
    eventually(move || async move { actions.last_handle().is_some() }).await;
    let done = FakeExecutor::completion(&running.actions.last_handle().unwrap(), true, None);
    running.bus.publish(done).unwrap();

    let t = &task_id;
    eventually(move || async move {
        h.get_task(t).await.unwrap().map(|t| t.status) == Some(TaskStatus::Done)
    })
    .await;

    handle.shutdown().await.unwrap();
    running.join.await.unwrap();
}

#[tokio::test]
async fn completion_behind_a_burst_of_starts_is_not_lost() {
    let running = spawn(setup());
    let handle = running.handle.clone();

    let mut jobs = vec![command_job("a", "push")];
    jobs.extend((0..600).map(|n| command_job(&format!("fan-{n}"), "go")));
    handle.define_jobs(jobs).await.unwrap();

    let StartOutcome::Started(id) = handle.trigger(&JobId::new("a")).await.unwrap() else {
        panic!("expected a start");
    };
    let a_handle = running.actions.last_handle().unwrap();

    // Every start publishes store and lifecycle events the loop must wade through
    running.bus.publish(bare_event("go")).unwrap();
    running
        .bus
        .publish(FakeExecutor::completion(&a_handle, true, None))
        .unwrap();

    let (h, t) = (&handle, &id);
    eventually(move || async move {
        h.get_task(t).await.unwrap().map(|t| t.status) == Some(TaskStatus::Done)
    })
    .await;
    assert_eq!(
        handle
            .list_tasks(&TaskFilter::default())
            .await
            .unwrap()
            .len(),
        601
    );

    handle.shutdown().await.unwrap();
    running.join.await.unwrap();
}

#[tokio::test]
async fn closed_engine_reports_closed() {
    let running = spawn(setup());
    let handle = running.handle.clone();
    handle.shutdown().await.unwrap();
    running.join.await.unwrap();

    let err = handle.trigger(&JobId::new("build")).await.unwrap_err();
    assert!(matches!(err, RuntimeError::Closed));
    // Reads still work against the stores
    assert!(handle.list_jobs().await.unwrap().is_empty());
}

#[tokio::test]
async fn cancel_lookup_failure_reaches_the_caller() {
    let ctx = setup();
    let tasks = std::sync::Arc::clone(&ctx.tasks);
    let running = spawn(ctx);
    tasks.fail_reads(true);

    let err = running
        .handle
        .cancel(&tally_core::TaskId::new("gone"))
        .await
        .unwrap_err();
    assert!(matches!(err, RuntimeError::Store(_)), "{err}");

    running.handle.shutdown().await.unwrap();
    running.join.await.unwrap();
}

#[tokio::test]
async fn remove_job_through_handle() {
    let running = spawn(setup());
    let handle = running.handle.clone();
    handle
        .define_jobs(vec![command_job("build", "push")])
        .await
        .unwrap();

    handle.remove_job(&JobId::new("build")).await.unwrap();
    assert!(handle.get_job(&JobId::new("build")).await.unwrap().is_none());

    let err = handle.remove_job(&JobId::new("build")).await.unwrap_err();
    assert!(matches!(err, RuntimeError::JobNotFound(_)));

    handle.shutdown().await.unwrap();
    running.join.await.unwrap();
}

#[test]
fn tick_interval_has_a_floor() {
    let ctx = setup();
    let (engine, _handle) = Engine::new(ctx.runtime, Duration::from_millis(10));
    assert_eq!(engine.tick_interval, MIN_TICK_INTERVAL);
}
