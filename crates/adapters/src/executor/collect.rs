// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executor for `collect_work` steps.
//!
//! Collection runs in external collector processes. This executor only
//! announces the work on the bus; a collector reports back with a
//! `task-action-completed` event for the same handle.

use super::{ActionExecutor, ActionHandle, DispatchError, DispatchRequest};
use async_trait::async_trait;
use tally_core::{kinds, CollectRequested, Event, EventBus, IdGen, StepAction};

#[derive(Clone)]
pub struct CollectExecutor<G> {
    bus: EventBus,
    ids: G,
}

impl<G: IdGen> CollectExecutor<G> {
    pub fn new(bus: EventBus, ids: G) -> Self {
        Self { bus, ids }
    }
}

#[async_trait]
impl<G: IdGen> ActionExecutor for CollectExecutor<G> {
    async fn dispatch(&self, request: DispatchRequest) -> Result<ActionHandle, DispatchError> {
        let target = match request.action {
            StepAction::CollectWork { target } => target,
            other => return Err(DispatchError::Unsupported(other.kind())),
        };
        let handle = ActionHandle::new(self.ids.next());
        let payload = CollectRequested {
            handle: handle.to_string(),
            task_id: request.task_id.to_string(),
            target,
        };
        let event = Event::new(
            kinds::COLLECT_REQUESTED,
            serde_json::to_value(&payload).unwrap_or_default(),
        );
        // Nobody would ever complete the handle; fail the step now instead
        // of waiting out its timeout.
        self.bus
            .publish(event)
            .map_err(|_| DispatchError::Rejected("no collector is listening".to_string()))?;
        Ok(handle)
    }

    async fn cancel(&self, handle: &ActionHandle) {
        tracing::debug!(%handle, "collection cancel is advisory, collectors finish on their own");
    }
}

#[cfg(test)]
#[path = "collect_tests.rs"]
mod tests;
