// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Memory store with injectable failures, for tests.

use crate::memory::MemoryStore;
use crate::store::{DeleteMode, EntityStore, Snapshot};
use crate::{Entity, StoreError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

pub struct FlakyStore<E> {
    inner: MemoryStore<E>,
    fail_next: AtomicU32,
    fail_always: AtomicBool,
    fail_reads: AtomicBool,
    delay: Mutex<Option<Duration>>,
    write_attempts: AtomicU32,
}

impl<E: Entity> FlakyStore<E> {
    pub fn new(mode: DeleteMode) -> Self {
        Self {
            inner: MemoryStore::new(mode),
            fail_next: AtomicU32::new(0),
            fail_always: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
            delay: Mutex::new(None),
            write_attempts: AtomicU32::new(0),
        }
    }

    /// Fail the next `n` writes with an I/O error.
    pub fn fail_next(&self, n: u32) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Fail every write until turned off.
    pub fn fail_always(&self, on: bool) {
        self.fail_always.store(on, Ordering::SeqCst);
    }

    /// Fail every read until turned off.
    pub fn fail_reads(&self, on: bool) {
        self.fail_reads.store(on, Ordering::SeqCst);
    }

    fn read_gate(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other("injected read failure")));
        }
        Ok(())
    }

    /// Sleep before every write.
    pub fn delay_writes(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }

    pub fn write_attempts(&self) -> u32 {
        self.write_attempts.load(Ordering::SeqCst)
    }

    async fn gate(&self) -> Result<(), StoreError> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let injected = self.fail_always.load(Ordering::SeqCst)
            || self
                .fail_next
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
        if injected {
            return Err(StoreError::Io(std::io::Error::other("injected failure")));
        }
        Ok(())
    }
}

#[async_trait]
impl<E: Entity> EntityStore<E> for FlakyStore<E> {
    async fn update_many(&self, entities: Vec<E>) -> Result<(), StoreError> {
        self.gate().await?;
        self.inner.update_many(entities).await
    }

    async fn delete_value(&self, entity: &E) -> Result<(), StoreError> {
        self.gate().await?;
        self.inner.delete_value(entity).await
    }

    async fn all(&self) -> Result<Snapshot<E>, StoreError> {
        self.read_gate()?;
        self.inner.all().await
    }

    async fn get(&self, id: &str) -> Result<Option<E>, StoreError> {
        self.read_gate()?;
        self.inner.get(id).await
    }

    async fn wipe(&self) -> Result<(), StoreError> {
        self.gate().await?;
        self.inner.wipe().await
    }
}
