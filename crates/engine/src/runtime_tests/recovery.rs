// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resuming persisted instances after a restart

use super::*;
use tally_core::SurpassBehaviour;

#[tokio::test]
async fn recover_loads_jobs() {
    let mut first = setup();
    first.define(command_job("build", "push")).await;

    let mut second = restart(&first, test_config());
    assert_eq!(second.runtime.recover().await.unwrap(), 0);

    let ids: Vec<&str> = second.runtime.jobs().map(|j| j.id.as_str()).collect();
    assert_eq!(ids, vec!["build"]);
    start_one(&mut second, "build").await;
}

#[tokio::test]
async fn running_task_redispatches_current_step() {
    let mut first = setup();
    first.define(multi_step_job("pipe", "push", 3)).await;
    let id = start_one(&mut first, "pipe").await;
    first.complete_last().await;

    let mut second = restart(&first, test_config());
    assert_eq!(second.runtime.recover().await.unwrap(), 1);

    assert_eq!(second.status(&id), Some(TaskStatus::Running));
    let dispatched = second.dispatched();
    assert_eq!(dispatched.len(), 1);
    assert_eq!(dispatched[0].task_id, id);
    assert_eq!(dispatched[0].step, 1);
    assert!(second
        .runtime
        .scheduler()
        .is_set(&TimerId::step_timeout(&id)));

    second.complete_last().await;
    second.complete_last().await;
    assert_eq!(second.stored(&id).await.status, TaskStatus::Done);
}

#[tokio::test]
async fn waiting_task_keeps_remaining_time() {
    let mut first = setup();
    first.define(waiting_job("deploy", "push", "approved", 30)).await;
    let id = start_one(&mut first, "deploy").await;
    first.complete_last().await;
    first.clock.advance(Duration::from_secs(20));

    let mut second = restart(&first, test_config());
    second.runtime.recover().await.unwrap();
    assert_eq!(second.status(&id), Some(TaskStatus::Waiting));
    assert!(second.dispatched().is_empty());

    second.advance(Duration::from_secs(9)).await;
    assert_eq!(second.status(&id), Some(TaskStatus::Waiting));

    second.advance(Duration::from_secs(2)).await;
    assert_eq!(second.stored(&id).await.status, TaskStatus::TimedOut);
}

#[tokio::test]
async fn waiting_task_still_takes_its_trigger() {
    let mut first = setup();
    first.define(waiting_job("deploy", "push", "approved", 30)).await;
    let id = start_one(&mut first, "deploy").await;
    first.complete_last().await;

    let mut second = restart(&first, test_config());
    second.runtime.recover().await.unwrap();
    second.fire("approved").await;

    assert_eq!(second.stored(&id).await.status, TaskStatus::Done);
}

#[tokio::test]
async fn pending_task_is_queued_again() {
    let mut first = setup();
    first
        .define(command_job("build", "push").with_concurrency(1, SurpassBehaviour::Wait))
        .await;
    let running = start_one(&mut first, "build").await;
    first.fire("push").await;

    let mut second = restart(&first, test_config());
    assert_eq!(second.runtime.recover().await.unwrap(), 2);

    let dispatched = second.dispatched();
    assert_eq!(dispatched.len(), 1);
    assert_eq!(dispatched[0].task_id, running);

    second.complete_last().await;
    let dispatched = second.dispatched();
    assert_eq!(dispatched.len(), 2);
    assert_ne!(dispatched[1].task_id, running);
}

#[tokio::test]
async fn pending_task_starts_when_capacity_is_free() {
    let mut first = setup();
    first
        .define(command_job("build", "push").with_concurrency(1, SurpassBehaviour::Wait))
        .await;
    let running = start_one(&mut first, "build").await;
    first.fire("push").await;
    first.complete_last().await;
    assert_eq!(first.stored(&running).await.status, TaskStatus::Done);

    // Simulate a crash between the finish and the queued start
    let mut queued = first
        .stored_for("build")
        .await
        .into_iter()
        .find(|t| t.id != running)
        .unwrap();
    queued.status = TaskStatus::Pending;
    queued.step_deadline_ms = None;
    first.tasks.update_many(vec![queued.clone()]).await.unwrap();

    let mut second = restart(&first, test_config());
    second.runtime.recover().await.unwrap();

    assert_eq!(second.status(&queued.id), Some(TaskStatus::Running));
    assert_eq!(second.dispatched()[0].task_id, queued.id);
}

#[tokio::test]
async fn task_of_missing_job_fails() {
    let mut first = setup();
    first.define(command_job("build", "push")).await;
    let id = start_one(&mut first, "build").await;
    let job = first.jobs.get("build").await.unwrap().unwrap();
    first.jobs.delete_value(&job).await.unwrap();

    let mut second = restart(&first, test_config());
    second.runtime.recover().await.unwrap();

    let stored = second.stored(&id).await;
    assert_eq!(stored.status, TaskStatus::Failed);
    assert_eq!(stored.error.as_deref(), Some("job build no longer exists"));
    assert!(second.live_for("build").is_empty());
}

#[tokio::test]
async fn finished_tasks_stay_finished() {
    let mut first = setup();
    first.define(command_job("build", "push")).await;
    let id = start_one(&mut first, "build").await;
    first.complete_last().await;

    let mut second = restart(&first, test_config());
    assert_eq!(second.runtime.recover().await.unwrap(), 0);
    assert_eq!(second.status(&id), None);
    assert!(second.dispatched().is_empty());
}
