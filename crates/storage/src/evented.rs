// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store decorator that announces committed writes on the event bus.
//!
//! One `<kind>-updated-many` event per successful `update_many` call,
//! however many entities the batch holds, and one `<kind>-deleted` event per
//! successful `delete_value`. A failed store call emits nothing. A failed
//! emission is logged; the write stays committed.

use crate::store::{EntityStore, Snapshot};
use crate::{Entity, StoreError};
use async_trait::async_trait;
use serde_json::json;
use std::marker::PhantomData;
use tally_core::{kinds, Event, EventBus};

pub struct EventedEntityStore<S, E> {
    inner: S,
    bus: EventBus,
    _entity: PhantomData<fn() -> E>,
}

impl<S, E> EventedEntityStore<S, E>
where
    S: EntityStore<E>,
    E: Entity,
{
    pub fn new(inner: S, bus: EventBus) -> Self {
        Self {
            inner,
            bus,
            _entity: PhantomData,
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn emit(&self, event: Event) {
        let summary = event.log_summary();
        if let Err(e) = self.bus.publish(event) {
            tracing::warn!(event = %summary, error = %e, "lifecycle event not delivered");
        }
    }
}

#[async_trait]
impl<S, E> EntityStore<E> for EventedEntityStore<S, E>
where
    S: EntityStore<E>,
    E: Entity,
{
    async fn update_many(&self, entities: Vec<E>) -> Result<(), StoreError> {
        let ids: Vec<String> = entities.iter().map(|e| e.id().to_string()).collect();
        self.inner.update_many(entities).await?;
        self.emit(Event::new(
            kinds::updated_many(E::KIND),
            json!({ "ids": ids }),
        ));
        Ok(())
    }

    async fn delete_value(&self, entity: &E) -> Result<(), StoreError> {
        self.inner.delete_value(entity).await?;
        self.emit(Event::new(
            kinds::deleted(E::KIND),
            json!({ "id": entity.id() }),
        ));
        Ok(())
    }

    async fn all(&self) -> Result<Snapshot<E>, StoreError> {
        self.inner.all().await
    }

    async fn get(&self, id: &str) -> Result<Option<E>, StoreError> {
        self.inner.get(id).await
    }

    async fn wipe(&self) -> Result<(), StoreError> {
        self.inner.wipe().await
    }
}

#[cfg(test)]
#[path = "evented_tests.rs"]
mod tests;
