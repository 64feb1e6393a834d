// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::de::DeserializeOwned;
use serde::Serialize;
use tally_core::{JobDescriptor, TaskInstance};

/// A value kept in an entity store, keyed by a string id.
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Collection name, also the prefix of lifecycle event kinds.
    const KIND: &'static str;

    fn id(&self) -> &str;
}

impl Entity for JobDescriptor {
    const KIND: &'static str = "job";

    fn id(&self) -> &str {
        self.id.as_str()
    }
}

impl Entity for TaskInstance {
    const KIND: &'static str = "task";

    fn id(&self) -> &str {
        self.id.as_str()
    }
}
