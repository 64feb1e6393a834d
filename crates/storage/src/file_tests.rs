// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tally_core::test_support::{command_job, pending_task};
use tally_core::{JobDescriptor, TaskInstance};
use tempfile::tempdir;

#[tokio::test]
async fn writes_survive_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("jobs.json");

    let store = FileStore::<JobDescriptor>::open(&path, DeleteMode::Strict).unwrap();
    store
        .update_many(vec![command_job("a", "go"), command_job("b", "go")])
        .await
        .unwrap();
    store.delete_value(&command_job("a", "go")).await.unwrap();
    drop(store);

    let reopened = FileStore::<JobDescriptor>::open(&path, DeleteMode::Strict).unwrap();
    let all = reopened.all().await.unwrap();
    assert_eq!(all.to_vec(), vec![command_job("b", "go")]);
}

#[tokio::test]
async fn missing_file_opens_empty() {
    let dir = tempdir().unwrap();
    let store = FileStore::<TaskInstance>::open(dir.path().join("tasks.json"), DeleteMode::Strict)
        .unwrap();
    assert!(store.all().await.unwrap().is_empty());
    assert!(!store.path().exists());
}

#[tokio::test]
async fn creates_parent_directories() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested/state/tasks.json");
    let store = FileStore::<TaskInstance>::open(&path, DeleteMode::Strict).unwrap();
    store
        .update_many(vec![pending_task("run-1", "a")])
        .await
        .unwrap();
    assert!(path.exists());
    assert!(!path.with_extension("tmp").exists());
}

#[tokio::test]
async fn file_names_its_collection() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("jobs.json");
    let store = FileStore::<JobDescriptor>::open(&path, DeleteMode::Strict).unwrap();
    store.update_many(vec![command_job("a", "go")]).await.unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["kind"], "job");
    assert_eq!(raw["entities"][0]["id"], "a");
}

#[tokio::test]
async fn strict_delete_failure_leaves_file_untouched() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("jobs.json");
    let store = FileStore::<JobDescriptor>::open(&path, DeleteMode::Strict).unwrap();
    store.update_many(vec![command_job("a", "go")]).await.unwrap();
    let before = std::fs::read_to_string(&path).unwrap();

    assert!(matches!(
        store.delete_value(&command_job("ghost", "go")).await,
        Err(StoreError::NotFound { .. })
    ));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
}

#[tokio::test]
async fn lenient_delete_of_unknown_id_skips_write() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("jobs.json");
    let store = FileStore::<JobDescriptor>::open(&path, DeleteMode::Lenient).unwrap();
    store.delete_value(&command_job("ghost", "go")).await.unwrap();
    assert!(!path.exists());
}

#[test]
fn corrupt_file_moves_to_bak() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("jobs.json");
    std::fs::write(&path, "{not json").unwrap();

    let store = FileStore::<JobDescriptor>::open(&path, DeleteMode::Strict).unwrap();
    assert!(store.cache.snapshot().is_empty());
    assert!(!path.exists());
    assert_eq!(
        std::fs::read_to_string(path.with_extension("bak")).unwrap(),
        "{not json"
    );
}

#[test]
fn bak_rotation_keeps_three() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("jobs.json");

    for i in 1..=4 {
        std::fs::write(&path, format!("corrupt {}", i)).unwrap();
        FileStore::<JobDescriptor>::open(&path, DeleteMode::Strict).unwrap();
    }

    let read = |ext: &str| std::fs::read_to_string(path.with_extension(ext)).unwrap();
    assert_eq!(read("bak"), "corrupt 4");
    assert_eq!(read("bak.2"), "corrupt 3");
    assert_eq!(read("bak.3"), "corrupt 2");
    assert!(!path.with_extension("bak.4").exists());
}

#[tokio::test]
async fn wipe_persists_empty_collection() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("jobs.json");
    let store = FileStore::<JobDescriptor>::open(&path, DeleteMode::Strict).unwrap();
    store.update_many(vec![command_job("a", "go")]).await.unwrap();
    store.wipe().await.unwrap();

    let reopened = FileStore::<JobDescriptor>::open(&path, DeleteMode::Strict).unwrap();
    assert!(reopened.all().await.unwrap().is_empty());
}
