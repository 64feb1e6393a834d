// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Copy-on-write in-memory store.
//!
//! Readers clone the current `Arc` and iterate without holding the lock.
//! Writers copy the map only while a snapshot is still alive.

use crate::store::{DeleteMode, EntityStore, Snapshot};
use crate::{Entity, StoreError};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug)]
pub struct MemoryStore<E> {
    entries: RwLock<Arc<BTreeMap<String, E>>>,
    mode: DeleteMode,
}

impl<E: Entity> MemoryStore<E> {
    pub fn new(mode: DeleteMode) -> Self {
        Self::with_entries(mode, BTreeMap::new())
    }

    pub(crate) fn with_entries(mode: DeleteMode, entries: BTreeMap<String, E>) -> Self {
        Self {
            entries: RwLock::new(Arc::new(entries)),
            mode,
        }
    }

    pub fn mode(&self) -> DeleteMode {
        self.mode
    }

    pub(crate) fn snapshot(&self) -> Snapshot<E> {
        Snapshot::new(Arc::clone(&self.entries.read()))
    }

    /// The map that would result from upserting `entities`.
    pub(crate) fn preview_update(&self, entities: &[E]) -> BTreeMap<String, E> {
        let mut next = (**self.entries.read()).clone();
        for entity in entities {
            next.insert(entity.id().to_string(), entity.clone());
        }
        next
    }

    /// The map that would result from deleting `id`, or `None` when the
    /// delete is a lenient no-op.
    pub(crate) fn preview_delete(&self, id: &str) -> Result<Option<BTreeMap<String, E>>, StoreError> {
        let current = self.entries.read();
        if !current.contains_key(id) {
            return match self.mode {
                DeleteMode::Strict => Err(StoreError::NotFound {
                    kind: E::KIND,
                    id: id.to_string(),
                }),
                DeleteMode::Lenient => Ok(None),
            };
        }
        let mut next = (**current).clone();
        next.remove(id);
        Ok(Some(next))
    }

    pub(crate) fn replace(&self, entries: BTreeMap<String, E>) {
        *self.entries.write() = Arc::new(entries);
    }

    fn upsert(&self, entities: Vec<E>) {
        let mut guard = self.entries.write();
        let map = Arc::make_mut(&mut guard);
        for entity in entities {
            map.insert(entity.id().to_string(), entity);
        }
    }

    fn remove(&self, id: &str) -> Result<(), StoreError> {
        let mut guard = self.entries.write();
        if !guard.contains_key(id) {
            return match self.mode {
                DeleteMode::Strict => Err(StoreError::NotFound {
                    kind: E::KIND,
                    id: id.to_string(),
                }),
                DeleteMode::Lenient => Ok(()),
            };
        }
        Arc::make_mut(&mut guard).remove(id);
        Ok(())
    }
}

impl<E: Entity> Default for MemoryStore<E> {
    fn default() -> Self {
        Self::new(DeleteMode::default())
    }
}

#[async_trait]
impl<E: Entity> EntityStore<E> for MemoryStore<E> {
    async fn update_many(&self, entities: Vec<E>) -> Result<(), StoreError> {
        self.upsert(entities);
        Ok(())
    }

    async fn delete_value(&self, entity: &E) -> Result<(), StoreError> {
        self.remove(entity.id())
    }

    async fn all(&self) -> Result<Snapshot<E>, StoreError> {
        Ok(self.snapshot())
    }

    async fn get(&self, id: &str) -> Result<Option<E>, StoreError> {
        Ok(self.entries.read().get(id).cloned())
    }

    async fn wipe(&self) -> Result<(), StoreError> {
        self.replace(BTreeMap::new());
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
