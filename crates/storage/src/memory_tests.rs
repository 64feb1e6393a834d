// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tally_core::test_support::command_job;
use tally_core::JobDescriptor;

fn ids(snapshot: &Snapshot<JobDescriptor>) -> Vec<String> {
    snapshot.iter().map(|j| j.id.to_string()).collect()
}

#[tokio::test]
async fn update_many_is_idempotent() {
    let store = MemoryStore::<JobDescriptor>::default();
    let batch = vec![command_job("a", "go"), command_job("b", "go")];

    store.update_many(batch.clone()).await.unwrap();
    store.update_many(batch).await.unwrap();

    assert_eq!(ids(&store.all().await.unwrap()), vec!["a", "b"]);
}

#[tokio::test]
async fn round_trip_is_structurally_equal() {
    let store = MemoryStore::<JobDescriptor>::default();
    let job = command_job("a", "go");
    store.update_many(vec![job.clone()]).await.unwrap();

    let all = store.all().await.unwrap();
    assert_eq!(all.to_vec(), vec![job.clone()]);
    assert_eq!(store.get("a").await.unwrap(), Some(job));
    assert_eq!(store.get("zzz").await.unwrap(), None);
}

#[tokio::test]
async fn upsert_replaces_by_id() {
    let store = MemoryStore::<JobDescriptor>::default();
    store.update_many(vec![command_job("a", "go")]).await.unwrap();
    store.update_many(vec![command_job("a", "stop")]).await.unwrap();

    let all = store.all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all.get("a"), Some(&command_job("a", "stop")));
}

#[tokio::test]
async fn delete_converges_to_empty() {
    let store = MemoryStore::<JobDescriptor>::default();
    let jobs = vec![command_job("a", "go"), command_job("b", "go"), command_job("c", "go")];
    store.update_many(jobs.clone()).await.unwrap();

    for job in &jobs {
        store.delete_value(job).await.unwrap();
    }
    assert!(store.all().await.unwrap().is_empty());
}

#[tokio::test]
async fn strict_delete_of_unknown_id_fails() {
    let store = MemoryStore::new(DeleteMode::Strict);
    let err = store.delete_value(&command_job("ghost", "go")).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { kind: "job", ref id } if id == "ghost"));
}

#[tokio::test]
async fn lenient_delete_of_unknown_id_succeeds() {
    let store = MemoryStore::<JobDescriptor>::new(DeleteMode::Lenient);
    store.delete_value(&command_job("ghost", "go")).await.unwrap();
    assert_eq!(store.mode(), DeleteMode::Lenient);
}

#[tokio::test]
async fn snapshot_ignores_later_writes() {
    let store = MemoryStore::<JobDescriptor>::default();
    store.update_many(vec![command_job("a", "go")]).await.unwrap();

    let before = store.all().await.unwrap();
    store.update_many(vec![command_job("b", "go")]).await.unwrap();
    store.delete_value(&command_job("a", "go")).await.unwrap();

    assert_eq!(ids(&before), vec!["a"]);
    assert_eq!(ids(&store.all().await.unwrap()), vec!["b"]);
}

#[tokio::test]
async fn wipe_clears_everything() {
    let store = MemoryStore::<JobDescriptor>::default();
    store.update_many(vec![command_job("a", "go")]).await.unwrap();
    store.wipe().await.unwrap();
    assert!(store.all().await.unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_readers_see_whole_entities() {
    let store = std::sync::Arc::new(MemoryStore::<JobDescriptor>::default());
    let writer = {
        let store = store.clone();
        tokio::spawn(async move {
            for i in 0..50 {
                let trigger = format!("t{}", i);
                store
                    .update_many(vec![command_job("a", &trigger), command_job("b", &trigger)])
                    .await
                    .unwrap();
            }
        })
    };
    for _ in 0..50 {
        let snapshot = store.all().await.unwrap();
        for job in &snapshot {
            assert!(job.validate().is_ok());
        }
        tokio::task::yield_now().await;
    }
    writer.await.unwrap();
    assert_eq!(store.all().await.unwrap().len(), 2);
}
