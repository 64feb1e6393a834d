// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retention of finished instances

use super::Runtime;
use tally_adapters::{ActionExecutor, NotifyAdapter};
use tally_core::{Clock, IdGen, JobId, TaskInstance};

impl<X, N, C, G> Runtime<X, N, C, G>
where
    X: ActionExecutor,
    N: NotifyAdapter,
    C: Clock,
    G: IdGen,
{
    /// Delete the oldest finished instances of `job_id` beyond the
    /// retention limit. Failures are logged and retried on the next finish.
    pub(crate) async fn archive(&self, job_id: &JobId) {
        let timeout = self.config.store_timeout;
        let snapshot = match tokio::time::timeout(timeout, self.task_store.all()).await {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(e)) => {
                tracing::warn!(%job_id, error = %e, "archive scan failed");
                return;
            }
            Err(_) => {
                tracing::warn!(%job_id, "archive scan timed out");
                return;
            }
        };

        let mut finished: Vec<&TaskInstance> = snapshot
            .iter()
            .filter(|t| &t.job_id == job_id && t.is_terminal())
            .collect();
        if finished.len() <= self.config.retain_finished {
            return;
        }
        // Newest first; everything past the limit goes.
        finished.sort_by(|a, b| {
            b.finished_at_ms
                .cmp(&a.finished_at_ms)
                .then_with(|| b.created_at_ms.cmp(&a.created_at_ms))
                .then_with(|| b.id.cmp(&a.id))
        });

        let expired = &finished[self.config.retain_finished..];
        tracing::debug!(%job_id, count = expired.len(), "archiving finished tasks");
        for task in expired {
            match tokio::time::timeout(timeout, self.task_store.delete_value(task)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(task_id = %task.id, error = %e, "archive delete failed"),
                Err(_) => tracing::warn!(task_id = %task.id, "archive delete timed out"),
            }
        }
    }
}
