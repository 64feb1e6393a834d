// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The entity store contract.

use crate::{Entity, StoreError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// How `delete_value` treats an id the store does not hold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeleteMode {
    /// Fail with [`StoreError::NotFound`].
    #[default]
    Strict,
    /// Succeed without effect.
    Lenient,
}

/// Immutable point-in-time view of a collection, ordered by id.
///
/// Iteration never observes writes made after the snapshot was taken.
#[derive(Debug)]
pub struct Snapshot<E> {
    entries: Arc<BTreeMap<String, E>>,
}

impl<E> Clone for Snapshot<E> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<E> Snapshot<E> {
    pub(crate) fn new(entries: Arc<BTreeMap<String, E>>) -> Self {
        Self { entries }
    }

    pub fn iter(&self) -> impl Iterator<Item = &E> + '_ {
        self.entries.values()
    }

    pub fn get(&self, id: &str) -> Option<&E> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<E: Clone> Snapshot<E> {
    pub fn to_vec(&self) -> Vec<E> {
        self.entries.values().cloned().collect()
    }
}

impl<'a, E> IntoIterator for &'a Snapshot<E> {
    type Item = &'a E;
    type IntoIter = std::collections::btree_map::Values<'a, String, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.values()
    }
}

/// Keyed persistence for one entity collection.
#[async_trait]
pub trait EntityStore<E: Entity>: Send + Sync + 'static {
    /// Upsert a batch by id. Repeating the same batch leaves the same contents.
    async fn update_many(&self, entities: Vec<E>) -> Result<(), StoreError>;

    /// Remove by id, subject to the store's [`DeleteMode`].
    async fn delete_value(&self, entity: &E) -> Result<(), StoreError>;

    async fn all(&self) -> Result<Snapshot<E>, StoreError>;

    async fn get(&self, id: &str) -> Result<Option<E>, StoreError>;

    /// Remove everything. Bootstrap and test paths only.
    async fn wipe(&self) -> Result<(), StoreError>;
}

#[async_trait]
impl<E: Entity, S: EntityStore<E> + ?Sized> EntityStore<E> for Arc<S> {
    async fn update_many(&self, entities: Vec<E>) -> Result<(), StoreError> {
        (**self).update_many(entities).await
    }

    async fn delete_value(&self, entity: &E) -> Result<(), StoreError> {
        (**self).delete_value(entity).await
    }

    async fn all(&self) -> Result<Snapshot<E>, StoreError> {
        (**self).all().await
    }

    async fn get(&self, id: &str) -> Result<Option<E>, StoreError> {
        (**self).get(id).await
    }

    async fn wipe(&self) -> Result<(), StoreError> {
        (**self).wipe().await
    }
}
