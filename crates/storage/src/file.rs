// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON-file-backed store.
//!
//! One file per collection. Every write serializes the whole collection to
//! `<file>.tmp`, syncs it, and renames it over the previous file, so a crash
//! mid-write leaves the last committed contents intact. The in-memory cache
//! only changes after the rename succeeds.

use crate::memory::MemoryStore;
use crate::store::{DeleteMode, EntityStore, Snapshot};
use crate::{Entity, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

const MAX_BAK_FILES: u32 = 3;

#[derive(Serialize)]
struct CollectionOut<'a, E> {
    kind: &'static str,
    saved_at: DateTime<Utc>,
    entities: Vec<&'a E>,
}

#[derive(Deserialize)]
struct CollectionIn<E> {
    entities: Vec<E>,
}

#[derive(Debug)]
pub struct FileStore<E> {
    path: PathBuf,
    cache: MemoryStore<E>,
    write_lock: tokio::sync::Mutex<()>,
}

impl<E: Entity> FileStore<E> {
    /// Open the collection at `path`, loading any existing contents.
    ///
    /// A corrupt file is moved aside to `.bak` and the store starts empty.
    pub fn open(path: impl Into<PathBuf>, mode: DeleteMode) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = load::<E>(&path)?;
        Ok(Self {
            path,
            cache: MemoryStore::with_entries(mode, entries),
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn commit(&self, next: BTreeMap<String, E>) -> Result<(), StoreError> {
        let out = CollectionOut {
            kind: E::KIND,
            saved_at: Utc::now(),
            entities: next.values().collect(),
        };
        let bytes = serde_json::to_vec_pretty(&out)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&path, &bytes))
            .await
            .map_err(std::io::Error::other)??;
        self.cache.replace(next);
        Ok(())
    }
}

#[async_trait]
impl<E: Entity> EntityStore<E> for FileStore<E> {
    async fn update_many(&self, entities: Vec<E>) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let next = self.cache.preview_update(&entities);
        self.commit(next).await
    }

    async fn delete_value(&self, entity: &E) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        match self.cache.preview_delete(entity.id())? {
            Some(next) => self.commit(next).await,
            None => Ok(()),
        }
    }

    async fn all(&self) -> Result<Snapshot<E>, StoreError> {
        Ok(self.cache.snapshot())
    }

    async fn get(&self, id: &str) -> Result<Option<E>, StoreError> {
        Ok(self.cache.snapshot().get(id).cloned())
    }

    async fn wipe(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.commit(BTreeMap::new()).await
    }
}

fn load<E: Entity>(path: &Path) -> Result<BTreeMap<String, E>, StoreError> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }

    let file = File::open(path)?;
    match serde_json::from_reader::<_, CollectionIn<E>>(BufReader::new(file)) {
        Ok(collection) => Ok(collection
            .entities
            .into_iter()
            .map(|e| (e.id().to_string(), e))
            .collect()),
        Err(e) => {
            let bak_path = rotate_bak_path(path);
            warn!(
                error = %e,
                path = %path.display(),
                bak = %bak_path.display(),
                "Corrupt collection file, moving to .bak and starting fresh",
            );
            fs::rename(path, &bak_path)?;
            Ok(BTreeMap::new())
        }
    }
}

/// Write `bytes` to `path` via a synced temp file and rename.
fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("tmp");
    {
        let mut file = File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)
}

/// Pick the next `.bak` / `.bak.N` path, rotating older backups out.
///
/// Keeps up to [`MAX_BAK_FILES`] backups: `.bak`, `.bak.2`, `.bak.3`.
fn rotate_bak_path(path: &Path) -> PathBuf {
    let bak = |n: u32| {
        if n == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    };

    let oldest = bak(MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }
    for n in (1..MAX_BAK_FILES).rev() {
        let src = bak(n);
        if src.exists() {
            let _ = fs::rename(&src, bak(n + 1));
        }
    }
    bak(1)
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
