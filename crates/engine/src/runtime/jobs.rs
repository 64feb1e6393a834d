// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Descriptor definitions: validated upserts, removal, and store changes

use super::{Runtime, Transition};
use crate::error::RuntimeError;
use serde::Deserialize;
use std::sync::Arc;
use tally_adapters::{ActionExecutor, NotifyAdapter};
use tally_core::{kinds, Clock, Event, IdGen, JobDescriptor, JobId, TaskId};
use tally_storage::StoreError;

#[derive(Deserialize)]
struct UpdatedIds {
    #[serde(default)]
    ids: Vec<String>,
}

#[derive(Deserialize)]
struct DeletedId {
    id: String,
}

impl<X, N, C, G> Runtime<X, N, C, G>
where
    X: ActionExecutor,
    N: NotifyAdapter,
    C: Clock,
    G: IdGen,
{
    /// Validate and store descriptors. Nothing is written if any is invalid.
    pub async fn define_jobs(
        &mut self,
        jobs: Vec<JobDescriptor>,
    ) -> Result<Vec<JobId>, RuntimeError> {
        let jobs: Vec<JobDescriptor> = jobs.into_iter().map(JobDescriptor::normalized).collect();
        for job in &jobs {
            job.validate()?;
        }

        let store = Arc::clone(&self.job_store);
        self.config
            .retry
            .run("update_many", self.config.store_timeout, || {
                let store = Arc::clone(&store);
                let batch = jobs.clone();
                async move { store.update_many(batch).await }
            })
            .await?;

        let ids: Vec<JobId> = jobs.iter().map(|j| j.id.clone()).collect();
        for job in jobs {
            self.install(job);
        }
        Ok(ids)
    }

    /// Delete a descriptor. Its live instances are cancelled.
    pub async fn remove_job(&mut self, job_id: &JobId) -> Result<(), RuntimeError> {
        let job = self
            .jobs
            .get(job_id)
            .cloned()
            .ok_or_else(|| RuntimeError::JobNotFound(job_id.clone()))?;

        let store = Arc::clone(&self.job_store);
        let deleted = self
            .config
            .retry
            .run("delete_value", self.config.store_timeout, || {
                let store = Arc::clone(&store);
                let job = job.clone();
                async move { store.delete_value(&job).await }
            })
            .await;
        match deleted {
            Ok(()) | Err(StoreError::NotFound { .. }) => {}
            Err(e) => return Err(e.into()),
        }

        let cancelled = self.forget(job_id);
        self.apply(cancelled).await;
        Ok(())
    }

    /// Follow descriptor writes made through the job store.
    pub(crate) async fn refresh_jobs(&mut self, event: &Event) {
        if event.is(kinds::JOB_DELETED) {
            let Ok(DeletedId { id }) = event.decode() else {
                tracing::warn!(event = %event.log_summary(), "malformed job deletion ignored");
                return;
            };
            let cancelled = self.forget(&JobId::new(id));
            self.apply(cancelled).await;
            return;
        }

        let Ok(UpdatedIds { ids }) = event.decode() else {
            tracing::warn!(event = %event.log_summary(), "malformed job update ignored");
            return;
        };
        for id in ids {
            let read = tokio::time::timeout(self.config.store_timeout, self.job_store.get(&id)).await;
            match read {
                Ok(Ok(Some(job))) => {
                    let job = job.normalized();
                    match job.validate() {
                        Ok(()) => self.install(job),
                        Err(e) => tracing::warn!(job_id = %id, error = %e, "stored job is invalid, ignored"),
                    }
                }
                Ok(Ok(None)) => {}
                Ok(Err(e)) => tracing::warn!(job_id = %id, error = %e, "job reload failed"),
                Err(_) => tracing::warn!(job_id = %id, "job reload timed out"),
            }
        }
    }

    pub(crate) fn install(&mut self, job: JobDescriptor) {
        let job_id = job.id.clone();
        if self.jobs.get(&job_id) == Some(&job) {
            return;
        }
        tracing::info!(
            %job_id,
            steps = job.steps.len(),
            trigger = ?job.trigger,
            active = job.active,
            "job defined"
        );
        self.jobs.insert(job_id, job);
    }

    /// Drop a descriptor and decide the cancellation of its instances.
    fn forget(&mut self, job_id: &JobId) -> Vec<Transition> {
        if self.jobs.remove(job_id).is_none() {
            return Vec::new();
        }
        tracing::info!(%job_id, "job removed");
        self.queued.remove(job_id);
        let owned: Vec<TaskId> = self
            .live
            .values()
            .filter(|t| &t.job_id == job_id)
            .map(|t| t.id.clone())
            .collect();
        owned
            .iter()
            .filter_map(|id| self.cancel_transition(id, "job removed"))
            .collect()
    }
}
