// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Routes each action kind to the executor that handles it.

use super::{ActionExecutor, ActionHandle, DispatchError, DispatchRequest};
use async_trait::async_trait;
use tally_core::StepAction;

#[derive(Clone)]
pub struct RoutingExecutor<C, K> {
    commands: C,
    collect: K,
}

impl<C, K> RoutingExecutor<C, K> {
    pub fn new(commands: C, collect: K) -> Self {
        Self { commands, collect }
    }
}

#[async_trait]
impl<C: ActionExecutor, K: ActionExecutor> ActionExecutor for RoutingExecutor<C, K> {
    async fn dispatch(&self, request: DispatchRequest) -> Result<ActionHandle, DispatchError> {
        match request.action {
            StepAction::ExecuteCommand { .. } => self.commands.dispatch(request).await,
            StepAction::CollectWork { .. } => self.collect.dispatch(request).await,
        }
    }

    // Both sides ignore handles they did not mint.
    async fn cancel(&self, handle: &ActionHandle) {
        self.commands.cancel(handle).await;
        self.collect.cancel(handle).await;
    }
}

#[cfg(test)]
#[path = "routing_tests.rs"]
mod tests;
