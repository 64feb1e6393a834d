// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake executor for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{ActionExecutor, ActionHandle, DispatchError, DispatchRequest};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tally_core::{kinds, ActionCompleted, Event};

/// Recorded executor call
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutorCall {
    Dispatch {
        handle: Option<ActionHandle>,
        request: DispatchRequest,
    },
    Cancel {
        handle: ActionHandle,
    },
}

#[derive(Default)]
struct FakeExecutorState {
    calls: Vec<ExecutorCall>,
    next_id: u64,
    rejections: VecDeque<String>,
    reject_all: Option<String>,
}

/// Fake executor: hands out `h-1`, `h-2`, ... and never runs anything.
///
/// Tests complete work explicitly with [`FakeExecutor::completion`].
#[derive(Clone, Default)]
pub struct FakeExecutor {
    inner: Arc<Mutex<FakeExecutorState>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the next dispatch with `reason`. Queues up.
    pub fn reject_next(&self, reason: impl Into<String>) {
        self.inner.lock().rejections.push_back(reason.into());
    }

    /// Reject every dispatch with `reason` until cleared with `None`.
    pub fn reject_all(&self, reason: Option<&str>) {
        self.inner.lock().reject_all = reason.map(str::to_string);
    }

    pub fn calls(&self) -> Vec<ExecutorCall> {
        self.inner.lock().calls.clone()
    }

    /// Accepted dispatches, in order.
    pub fn dispatched(&self) -> Vec<(ActionHandle, DispatchRequest)> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                ExecutorCall::Dispatch {
                    handle: Some(h),
                    request,
                } => Some((h.clone(), request.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn cancelled(&self) -> Vec<ActionHandle> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                ExecutorCall::Cancel { handle } => Some(handle.clone()),
                _ => None,
            })
            .collect()
    }

    /// Handle of the most recent accepted dispatch.
    pub fn last_handle(&self) -> Option<ActionHandle> {
        self.dispatched().pop().map(|(h, _)| h)
    }

    /// Build the completion event a real executor would publish.
    pub fn completion(handle: &ActionHandle, success: bool, message: Option<&str>) -> Event {
        let payload = ActionCompleted {
            handle: handle.to_string(),
            success,
            message: message.map(str::to_string),
        };
        Event::new(
            kinds::TASK_ACTION_COMPLETED,
            serde_json::to_value(&payload).unwrap_or_default(),
        )
    }
}

#[async_trait]
impl ActionExecutor for FakeExecutor {
    async fn dispatch(&self, request: DispatchRequest) -> Result<ActionHandle, DispatchError> {
        let mut inner = self.inner.lock();
        let rejection = inner
            .rejections
            .pop_front()
            .or_else(|| inner.reject_all.clone());
        if let Some(reason) = rejection {
            inner.calls.push(ExecutorCall::Dispatch {
                handle: None,
                request,
            });
            return Err(DispatchError::Rejected(reason));
        }
        inner.next_id += 1;
        let handle = ActionHandle::new(format!("h-{}", inner.next_id));
        inner.calls.push(ExecutorCall::Dispatch {
            handle: Some(handle.clone()),
            request,
        });
        Ok(handle)
    }

    async fn cancel(&self, handle: &ActionHandle) {
        self.inner.lock().calls.push(ExecutorCall::Cancel {
            handle: handle.clone(),
        });
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
