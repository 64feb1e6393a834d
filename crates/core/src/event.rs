// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events carried on the bus.
//!
//! An event is an open-ended `kind` string plus a JSON payload. Lifecycle
//! events from the entity stores, executor completions, and operator alerts
//! all travel as plain events; the well-known kinds and the typed payloads
//! the engine understands live here.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Well-known event kinds.
pub mod kinds {
    pub const JOB_UPDATED_MANY: &str = "job-updated-many";
    pub const JOB_DELETED: &str = "job-deleted";
    pub const TASK_UPDATED_MANY: &str = "task-updated-many";
    pub const TASK_DELETED: &str = "task-deleted";
    /// An executor finished a dispatched action.
    pub const TASK_ACTION_COMPLETED: &str = "task-action-completed";
    pub const TASK_STARTED: &str = "task-started";
    pub const TASK_FINISHED: &str = "task-finished";
    /// Work handed to external collectors.
    pub const COLLECT_REQUESTED: &str = "collect-requested";
    pub const OPERATOR_ALERT: &str = "operator-alert";
    pub const SUBSCRIBER_CONNECTED: &str = "subscriber-connected";

    /// Kind emitted after a batched upsert of `entity` values.
    pub fn updated_many(entity: &str) -> String {
        format!("{}-updated-many", entity)
    }

    /// Kind emitted after deleting one `entity` value.
    pub fn deleted(entity: &str) -> String {
        format!("{}-deleted", entity)
    }
}

/// An immutable bus event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// Create an event stamped with the current wall-clock time.
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self::at(kind, payload, Utc::now())
    }

    pub fn at(kind: impl Into<String>, payload: Value, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: kind.into(),
            payload,
            timestamp,
        }
    }

    /// Create an event with a typed payload.
    pub fn typed<T: Serialize>(
        kind: impl Into<String>,
        payload: &T,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self::at(
            kind,
            serde_json::to_value(payload).unwrap_or(Value::Null),
            timestamp,
        )
    }

    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }

    /// Decode the payload as `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.payload)
    }

    /// One-line summary for logs.
    pub fn log_summary(&self) -> String {
        let k = &self.kind;
        match &self.payload {
            Value::Null => k.clone(),
            Value::Object(map) => {
                let mut parts = vec![k.clone()];
                for key in ["id", "handle", "task_id", "job_id"] {
                    if let Some(Value::String(v)) = map.get(key) {
                        parts.push(format!("{key}={v}"));
                    }
                }
                if let Some(Value::Array(ids)) = map.get("ids") {
                    parts.push(format!("ids={}", ids.len()));
                }
                parts.join(" ")
            }
            _ => k.clone(),
        }
    }
}

/// Payload of `task-action-completed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCompleted {
    pub handle: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Payload of `collect-requested`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectRequested {
    pub handle: String,
    pub task_id: String,
    #[serde(default)]
    pub target: Value,
}

/// Payload of `operator-alert`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorAlert {
    pub title: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

/// Payload of `subscriber-connected`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberConnected {
    #[serde(default)]
    pub channels: Vec<String>,
}

/// Payload of `task-started` and `task-finished`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskLifecycle {
    pub task_id: String,
    pub job_id: String,
    pub status: String,
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
