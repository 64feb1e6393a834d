// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime for the Tally engine
//!
//! The runtime owns every live task instance and is the only writer of
//! task state. Handlers decide a [`Transition`] on a copy of the instance;
//! [`Runtime::apply`] stores it and only then performs its effects, so no
//! action is dispatched for a state that was never persisted.

mod archive;
mod cancel;
mod jobs;
mod recovery;
mod start;
mod steps;
mod subscriber;

pub use start::StartOutcome;
pub use subscriber::StartOnSubscriber;

use crate::executor::{Executor, Feedback};
use crate::retry::RetryPolicy;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tally_adapters::{ActionExecutor, NotifyAdapter};
use tally_core::event::TaskLifecycle;
use tally_core::trigger::catch_up_ticks;
use tally_core::{
    kinds, Clock, Effect, Event, EventBus, IdGen, JobDescriptor, JobId, Stimulus, TaskId,
    TaskInstance, TaskStatus, TimerId,
};
use tally_storage::{EntityStore, StoreError};

/// Entity store shared between the runtime and query handles.
pub type SharedStore<E> = Arc<dyn EntityStore<E>>;

/// Runtime tuning
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Backoff for failed task and job writes.
    pub retry: RetryPolicy,
    /// Upper bound on a single store call.
    pub store_timeout: Duration,
    /// Finished instances kept per descriptor; older ones are deleted.
    pub retain_finished: usize,
    pub start_on_subscriber: Option<StartOnSubscriber>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            store_timeout: Duration::from_secs(5),
            retain_finished: 100,
            start_on_subscriber: None,
        }
    }
}

/// Runtime adapter dependencies
pub struct RuntimeDeps<X, N, G> {
    pub actions: X,
    pub notifier: N,
    pub bus: EventBus,
    pub jobs: SharedStore<JobDescriptor>,
    pub tasks: SharedStore<TaskInstance>,
    pub ids: G,
}

/// A decided change to one instance plus what must follow once it is stored.
#[derive(Debug)]
pub(crate) struct Transition {
    pub task: TaskInstance,
    pub effects: Vec<Effect>,
}

/// Runtime that coordinates the system
pub struct Runtime<X, N, C: Clock, G> {
    pub(crate) executor: Executor<X, N, C>,
    pub(crate) job_store: SharedStore<JobDescriptor>,
    pub(crate) task_store: SharedStore<TaskInstance>,
    pub(crate) ids: G,
    pub(crate) config: RuntimeConfig,
    pub(crate) jobs: BTreeMap<JobId, JobDescriptor>,
    /// Non-terminal instances, including queued `Pending` ones.
    pub(crate) live: BTreeMap<TaskId, TaskInstance>,
    /// Executor handle to the instance waiting on it.
    pub(crate) handles: HashMap<String, TaskId>,
    /// Queued starts per descriptor, oldest first.
    pub(crate) queued: BTreeMap<JobId, VecDeque<TaskId>>,
    pub(crate) last_tick: DateTime<Utc>,
    pub(crate) subscriber_start: Option<(StartOnSubscriber, Instant)>,
}

impl<X, N, C, G> Runtime<X, N, C, G>
where
    X: ActionExecutor,
    N: NotifyAdapter,
    C: Clock,
    G: IdGen,
{
    /// Create a new runtime
    pub fn new(deps: RuntimeDeps<X, N, G>, clock: C, config: RuntimeConfig) -> Self {
        let last_tick = clock.utc_now();
        let subscriber_start = config
            .start_on_subscriber
            .clone()
            .map(|s| {
                let deadline = clock.now() + s.timeout;
                (s, deadline)
            });
        Self {
            executor: Executor::new(deps.actions, deps.notifier, deps.bus, clock),
            job_store: deps.jobs,
            task_store: deps.tasks,
            ids: deps.ids,
            config,
            jobs: BTreeMap::new(),
            live: BTreeMap::new(),
            handles: HashMap::new(),
            queued: BTreeMap::new(),
            last_tick,
            subscriber_start,
        }
    }

    /// Get a reference to the clock
    pub fn clock(&self) -> &C {
        self.executor.clock()
    }

    pub fn bus(&self) -> &EventBus {
        self.executor.bus()
    }

    pub fn scheduler(&self) -> &crate::Scheduler {
        self.executor.scheduler()
    }

    pub fn job_store(&self) -> SharedStore<JobDescriptor> {
        Arc::clone(&self.job_store)
    }

    pub fn task_store(&self) -> SharedStore<TaskInstance> {
        Arc::clone(&self.task_store)
    }

    /// Descriptors currently loaded
    pub fn jobs(&self) -> impl Iterator<Item = &JobDescriptor> {
        self.jobs.values()
    }

    /// Non-terminal instances, oldest id first
    pub fn live_tasks(&self) -> impl Iterator<Item = &TaskInstance> {
        self.live.values()
    }

    pub fn live_task(&self, id: &TaskId) -> Option<&TaskInstance> {
        self.live.get(id)
    }

    pub(crate) fn now_ms(&self) -> u64 {
        self.clock().epoch_ms()
    }

    /// Handle one bus event: completions, definition changes, then start
    /// triggers, then wait triggers.
    pub async fn handle_event(&mut self, event: Event) {
        tracing::debug!(event = %event.log_summary(), "stimulus");
        let held = self.waiting_ids();

        if event.is(kinds::TASK_ACTION_COMPLETED) {
            let transition = self.on_action_completed(&event);
            self.apply(transition.into_iter().collect()).await;
        } else if event.is(kinds::JOB_UPDATED_MANY) || event.is(kinds::JOB_DELETED) {
            self.refresh_jobs(&event).await;
        } else if event.is(kinds::SUBSCRIBER_CONNECTED) {
            self.on_subscriber_connected(&event).await;
        }

        let stimulus = Stimulus::Event(&event);
        let starts = self.start_matching(&stimulus);
        self.apply(starts).await;
        let waits = self.waits_matching(&stimulus, &event.kind, &held);
        self.apply(waits).await;
    }

    /// Advance time: time triggers for every second since the last tick,
    /// then elapsed deadlines.
    pub async fn tick(&mut self) {
        let now = self.clock().utc_now();
        let previous = std::mem::replace(&mut self.last_tick, now);
        let held = self.waiting_ids();
        for second in catch_up_ticks(previous, now) {
            let stimulus = Stimulus::Tick(second);
            let starts = self.start_matching(&stimulus);
            self.apply(starts).await;
            let waits = self.waits_matching(&stimulus, "tick", &held);
            self.apply(waits).await;
        }

        let now = self.clock().now();
        let fired = self.executor.scheduler_mut().fired_timers(now);
        for id in fired {
            let transition = self.on_timer(&id);
            self.apply(transition.into_iter().collect()).await;
        }

        self.check_subscriber_deadline().await;
    }

    /// Store each transition, then perform its effects, then react to any
    /// executor feedback, until nothing is left.
    pub(crate) async fn apply(&mut self, transitions: Vec<Transition>) {
        let mut pending: VecDeque<Transition> = transitions.into();
        while let Some(transition) = pending.pop_front() {
            let (effects, follow_ups) = self.commit(transition).await;
            pending.extend(follow_ups);
            for feedback in self.executor.execute_all(effects).await {
                if let Some(next) = self.on_feedback(feedback) {
                    pending.push_back(next);
                }
            }
        }
    }

    async fn commit(&mut self, transition: Transition) -> (Vec<Effect>, Vec<Transition>) {
        let Transition { mut task, mut effects } = transition;
        if let Err(e) = self.persist(&task).await {
            effects = self.persistence_exhausted(&mut task, &e, &effects).await;
        }
        let follow_ups = self.track(task).await;
        (effects, follow_ups)
    }

    /// Write one instance with bounded retries.
    pub(crate) async fn persist(&self, task: &TaskInstance) -> Result<(), StoreError> {
        let store = Arc::clone(&self.task_store);
        self.config
            .retry
            .run("update_many", self.config.store_timeout, || {
                let store = Arc::clone(&store);
                let batch = vec![task.clone()];
                async move { store.update_many(batch).await }
            })
            .await
    }

    /// The instance's state cannot be stored: fail it, tell the operator,
    /// and replace its effects with the cleanup for a dead instance.
    async fn persistence_exhausted(
        &mut self,
        task: &mut TaskInstance,
        error: &StoreError,
        planned: &[Effect],
    ) -> Vec<Effect> {
        tracing::error!(
            task_id = %task.id,
            job_id = %task.job_id,
            error = %error,
            "persistence retries exhausted, failing task"
        );
        // Work still running: a stop the transition already planned, or a
        // dispatched action nobody has heard back from.
        let in_flight = planned
            .iter()
            .find_map(|e| match e {
                Effect::CancelWork { handle, .. } => Some(handle.clone()),
                _ => None,
            })
            .or_else(|| {
                self.live
                    .get(&task.id)
                    .and_then(|t| t.handle.clone())
                    .filter(|h| self.handles.contains_key(h))
            });
        task.force_fail(format!("state could not be persisted: {}", error), self.now_ms());

        let once = tokio::time::timeout(
            self.config.store_timeout,
            self.task_store.update_many(vec![task.clone()]),
        )
        .await;
        if !matches!(once, Ok(Ok(()))) {
            tracing::warn!(task_id = %task.id, "failed state not stored either");
        }

        let mut effects = vec![
            Effect::CancelTimer {
                id: TimerId::step_timeout(&task.id),
            },
            Effect::CancelTimer {
                id: TimerId::wait_deadline(&task.id),
            },
        ];
        if let Some(handle) = in_flight {
            effects.push(Effect::CancelWork {
                task_id: task.id.clone(),
                handle,
            });
        }
        effects.push(Effect::Notify {
            title: "task state could not be persisted".to_string(),
            message: format!(
                "task {} of job {} was forced to failed: {}",
                task.id, task.job_id, error
            ),
            task_id: Some(task.id.clone()),
        });
        effects.push(self.lifecycle(kinds::TASK_FINISHED, task));
        effects
    }

    /// Record a stored instance in the live map, or retire it.
    async fn track(&mut self, task: TaskInstance) -> Vec<Transition> {
        if !task.is_terminal() {
            self.live.insert(task.id.clone(), task);
            return Vec::new();
        }

        self.live.remove(&task.id);
        self.handles.retain(|_, id| *id != task.id);
        if let Some(queue) = self.queued.get_mut(&task.job_id) {
            queue.retain(|id| *id != task.id);
        }
        tracing::info!(
            task_id = %task.id,
            job_id = %task.job_id,
            status = %task.status,
            steps = task.results.len(),
            error = task.error.as_deref().unwrap_or(""),
            "task finished"
        );
        self.archive(&task.job_id).await;
        self.release_queued(&task.job_id)
    }

    fn on_feedback(&mut self, feedback: Feedback) -> Option<Transition> {
        match feedback {
            Feedback::Dispatched {
                task_id,
                step,
                handle,
            } => {
                let now = self.now_ms();
                match self.live.get_mut(&task_id) {
                    Some(task) if task.status == TaskStatus::Running && task.step == step => {
                        task.dispatched(handle.as_str(), now);
                        self.handles.insert(handle.to_string(), task_id);
                    }
                    _ => {
                        tracing::warn!(%task_id, %handle, "dispatch accepted for a task that moved on");
                    }
                }
                None
            }
            Feedback::DispatchRejected {
                task_id,
                job_id,
                step,
                reason,
            } => {
                tracing::warn!(%task_id, %job_id, step, %reason, "dispatch rejected");
                self.fail_step(&task_id, step, reason)
            }
        }
    }

    /// `task-started` / `task-finished` announcement.
    pub(crate) fn lifecycle(&self, kind: &str, task: &TaskInstance) -> Effect {
        let payload = TaskLifecycle {
            task_id: task.id.to_string(),
            job_id: task.job_id.to_string(),
            status: task.status.to_string(),
        };
        Effect::Emit {
            event: Event::typed(kind, &payload, self.clock().utc_now()),
        }
    }
}

/// Display name of step `index`, falling back to its position.
pub(crate) fn step_name(job: Option<&JobDescriptor>, index: usize) -> String {
    job.and_then(|j| j.step(index))
        .map(|s| s.name.clone())
        .unwrap_or_else(|| format!("step-{}", index + 1))
}

#[cfg(test)]
#[path = "../runtime_tests/mod.rs"]
mod tests;
