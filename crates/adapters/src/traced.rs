// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::executor::{ActionExecutor, ActionHandle, DispatchError, DispatchRequest};
use crate::notify::{NotifyAdapter, NotifyError};
use async_trait::async_trait;
use tally_core::OperatorAlert;
use tracing::Instrument;

/// Handle prefix shown in cancel logs
const SHORT_HANDLE: usize = 12;

/// Wrapper that adds tracing to any ActionExecutor
#[derive(Clone)]
pub struct TracedExecutor<X> {
    inner: X,
}

impl<X> TracedExecutor<X> {
    pub fn new(inner: X) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<X: ActionExecutor> ActionExecutor for TracedExecutor<X> {
    async fn dispatch(&self, request: DispatchRequest) -> Result<ActionHandle, DispatchError> {
        let span = tracing::info_span!(
            "executor.dispatch",
            task_id = %request.task_id,
            job_id = %request.job_id,
            step = request.step,
        );
        async {
            tracing::info!(action = request.action.kind(), "dispatching");
            let start = std::time::Instant::now();
            let result = self.inner.dispatch(request).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(handle) => tracing::info!(%handle, elapsed_ms, "accepted"),
                Err(e) => tracing::warn!(elapsed_ms, error = %e, "dispatch failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn cancel(&self, handle: &ActionHandle) {
        self.inner.cancel(handle).await;
        tracing::info_span!("executor.cancel", handle = %handle.short(SHORT_HANDLE))
            .in_scope(|| tracing::info!("cancel requested"));
    }
}

/// Wrapper that adds tracing to any NotifyAdapter
#[derive(Clone)]
pub struct TracedNotify<N> {
    inner: N,
}

impl<N> TracedNotify<N> {
    pub fn new(inner: N) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<N: NotifyAdapter> NotifyAdapter for TracedNotify<N> {
    async fn notify(&self, alert: &OperatorAlert) -> Result<(), NotifyError> {
        let result = self.inner.notify(alert).await;
        tracing::info_span!("notify", title = %alert.title).in_scope(|| match &result {
            Ok(()) => tracing::debug!("alert delivered"),
            Err(e) => tracing::warn!(error = %e, "alert not delivered"),
        });
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
