// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Query and control surface for a running engine
//!
//! Reads go straight to the entity stores' snapshots. Anything that
//! changes task or job state is sent to the engine loop, which stays the
//! single writer.

use crate::error::RuntimeError;
use crate::runtime::{SharedStore, StartOutcome};
use std::sync::Arc;
use tally_core::{JobDescriptor, JobId, TaskId, TaskInstance};
use tokio::sync::{mpsc, oneshot};

/// Result of a cancel request. The numeric codes are stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CancelOutcome {
    Accepted = 0,
    NotFound = 1,
    AlreadyTerminal = 2,
}

impl CancelOutcome {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Which instances `list_tasks` returns.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub job_id: Option<JobId>,
    /// Only instances that have not reached a terminal status.
    pub active_only: bool,
}

impl TaskFilter {
    pub fn for_job(job_id: impl Into<JobId>) -> Self {
        Self {
            job_id: Some(job_id.into()),
            active_only: false,
        }
    }

    pub fn active(mut self) -> Self {
        self.active_only = true;
        self
    }

    fn accepts(&self, task: &TaskInstance) -> bool {
        if self.active_only && task.is_terminal() {
            return false;
        }
        match &self.job_id {
            Some(id) => *id == task.job_id,
            None => true,
        }
    }
}

pub(crate) enum Command {
    Cancel {
        task_id: TaskId,
        reply: oneshot::Sender<Result<CancelOutcome, RuntimeError>>,
    },
    Trigger {
        job_id: JobId,
        reply: oneshot::Sender<Result<StartOutcome, RuntimeError>>,
    },
    DefineJobs {
        jobs: Vec<JobDescriptor>,
        reply: oneshot::Sender<Result<Vec<JobId>, RuntimeError>>,
    },
    RemoveJob {
        job_id: JobId,
        reply: oneshot::Sender<Result<(), RuntimeError>>,
    },
    Shutdown,
}

/// Cloneable handle to an [`crate::Engine`].
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<Command>,
    jobs: SharedStore<JobDescriptor>,
    tasks: SharedStore<TaskInstance>,
}

impl EngineHandle {
    pub(crate) fn new(
        tx: mpsc::Sender<Command>,
        jobs: SharedStore<JobDescriptor>,
        tasks: SharedStore<TaskInstance>,
    ) -> Self {
        Self { tx, jobs, tasks }
    }

    pub async fn list_jobs(&self) -> Result<Vec<JobDescriptor>, RuntimeError> {
        Ok(self.jobs.all().await?.to_vec())
    }

    pub async fn get_job(&self, id: &JobId) -> Result<Option<JobDescriptor>, RuntimeError> {
        Ok(self.jobs.get(id.as_str()).await?)
    }

    /// Matching instances, oldest first.
    pub async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<TaskInstance>, RuntimeError> {
        let snapshot = self.tasks.all().await?;
        let mut tasks: Vec<TaskInstance> = snapshot
            .iter()
            .filter(|t| filter.accepts(t))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| {
            a.created_at_ms
                .cmp(&b.created_at_ms)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(tasks)
    }

    pub async fn get_task(&self, id: &TaskId) -> Result<Option<TaskInstance>, RuntimeError> {
        Ok(self.tasks.get(id.as_str()).await?)
    }

    pub async fn cancel(&self, task_id: &TaskId) -> Result<CancelOutcome, RuntimeError> {
        self.request(|reply| Command::Cancel {
            task_id: task_id.clone(),
            reply,
        })
        .await?
    }

    /// Start a job now, subject to its concurrency policy.
    pub async fn trigger(&self, job_id: &JobId) -> Result<StartOutcome, RuntimeError> {
        self.request(|reply| Command::Trigger {
            job_id: job_id.clone(),
            reply,
        })
        .await?
    }

    pub async fn define_jobs(&self, jobs: Vec<JobDescriptor>) -> Result<Vec<JobId>, RuntimeError> {
        self.request(|reply| Command::DefineJobs { jobs, reply })
            .await?
    }

    pub async fn remove_job(&self, job_id: &JobId) -> Result<(), RuntimeError> {
        self.request(|reply| Command::RemoveJob {
            job_id: job_id.clone(),
            reply,
        })
        .await?
    }

    /// Ask the loop to stop after the stimulus it is handling.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.tx
            .send(Command::Shutdown)
            .await
            .map_err(|_| RuntimeError::Closed)
    }

    pub fn task_store(&self) -> SharedStore<TaskInstance> {
        Arc::clone(&self.tasks)
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, RuntimeError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| RuntimeError::Closed)?;
        rx.await.map_err(|_| RuntimeError::Closed)
    }
}

#[cfg(test)]
#[path = "handle_tests.rs"]
mod tests;
