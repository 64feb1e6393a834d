// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Entity persistence for Tally: the store contract, an in-memory store,
//! a JSON file store, and the event-emitting decorator.

mod entity;
mod error;
mod evented;
mod file;
mod memory;
mod store;

#[cfg(any(test, feature = "test-support"))]
mod flaky;

pub use entity::Entity;
pub use error::StoreError;
pub use evented::EventedEntityStore;
pub use file::FileStore;
pub use memory::MemoryStore;
pub use store::{DeleteMode, EntityStore, Snapshot};

#[cfg(any(test, feature = "test-support"))]
pub use flaky::FlakyStore;
