// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::{DeleteMode, FlakyStore, MemoryStore};
use tally_core::test_support::{command_job, pending_task};
use tally_core::{JobDescriptor, KindFilter, Subscription, TaskInstance};

fn evented_jobs(
    mode: DeleteMode,
) -> (
    EventedEntityStore<MemoryStore<JobDescriptor>, JobDescriptor>,
    Subscription,
) {
    let bus = EventBus::new();
    let sub = bus.subscribe(KindFilter::All);
    (EventedEntityStore::new(MemoryStore::new(mode), bus), sub)
}

fn kinds_of(sub: &mut Subscription) -> Vec<String> {
    sub.drain().into_iter().map(|e| e.kind).collect()
}

#[tokio::test]
async fn two_updates_and_two_deletes_emit_four_events() {
    let (store, mut sub) = evented_jobs(DeleteMode::Strict);
    let a = command_job("id_a", "a");
    let b = command_job("id_b", "b");

    store.update_many(vec![a.clone(), b.clone()]).await.unwrap();
    store.update_many(vec![a.clone(), b.clone()]).await.unwrap();
    assert_eq!(store.all().await.unwrap().len(), 2);

    store.delete_value(&a).await.unwrap();
    store.delete_value(&b).await.unwrap();
    assert!(store.all().await.unwrap().is_empty());

    assert_eq!(
        kinds_of(&mut sub),
        vec![
            "job-updated-many",
            "job-updated-many",
            "job-deleted",
            "job-deleted"
        ]
    );
}

#[yare::parameterized(
    one   = { 1 },
    three = { 3 },
    many  = { 40 },
)]
fn one_event_per_batch(n: usize) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    rt.block_on(async {
        let (store, mut sub) = evented_jobs(DeleteMode::Strict);
        let batch: Vec<_> = (0..n).map(|i| command_job(&format!("j{}", i), "go")).collect();
        store.update_many(batch).await.unwrap();

        let events = sub.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].payload["ids"].as_array().map(Vec::len), Some(n));
    });
}

#[tokio::test]
async fn delete_payload_names_the_id() {
    let (store, mut sub) = evented_jobs(DeleteMode::Strict);
    store.update_many(vec![command_job("a", "go")]).await.unwrap();
    store.delete_value(&command_job("a", "go")).await.unwrap();

    let events = sub.drain();
    assert_eq!(events[1].kind, "job-deleted");
    assert_eq!(events[1].payload["id"], "a");
}

#[tokio::test]
async fn failed_delete_emits_nothing() {
    let (store, mut sub) = evented_jobs(DeleteMode::Strict);
    let err = store.delete_value(&command_job("ghost", "go")).await;
    assert!(matches!(err, Err(StoreError::NotFound { .. })));
    assert!(kinds_of(&mut sub).is_empty());
}

#[tokio::test]
async fn failed_update_emits_nothing_and_propagates() {
    let bus = EventBus::new();
    let mut sub = bus.subscribe(KindFilter::All);
    let store = EventedEntityStore::new(FlakyStore::<TaskInstance>::new(DeleteMode::Strict), bus);
    store.inner().fail_next(1);

    let err = store.update_many(vec![pending_task("run-1", "a")]).await;
    assert!(matches!(err, Err(StoreError::Io(_))));
    assert!(kinds_of(&mut sub).is_empty());

    store.update_many(vec![pending_task("run-1", "a")]).await.unwrap();
    assert_eq!(kinds_of(&mut sub), vec!["task-updated-many"]);
}

#[tokio::test]
async fn write_commits_without_subscribers() {
    let store = EventedEntityStore::new(MemoryStore::<JobDescriptor>::default(), EventBus::new());
    store.update_many(vec![command_job("a", "go")]).await.unwrap();
    assert_eq!(store.get("a").await.unwrap(), Some(command_job("a", "go")));
}

#[tokio::test]
async fn task_events_use_task_prefix() {
    let bus = EventBus::new();
    let mut sub = bus.subscribe(KindFilter::All);
    let store = EventedEntityStore::new(MemoryStore::<TaskInstance>::default(), bus);
    let task = pending_task("run-1", "a");
    store.update_many(vec![task.clone()]).await.unwrap();
    store.delete_value(&task).await.unwrap();
    assert_eq!(kinds_of(&mut sub), vec!["task-updated-many", "task-deleted"]);
}
