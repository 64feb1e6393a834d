// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for the engine crate.

use crate::{RetryPolicy, Runtime, RuntimeConfig, RuntimeDeps};
use std::sync::Arc;
use std::time::Duration;
use tally_adapters::{ActionHandle, DispatchRequest, FakeExecutor, FakeNotifyAdapter};
use tally_core::test_support::bare_event;
use tally_core::{
    Event, EventBus, FakeClock, JobDescriptor, KindFilter, SequentialIdGen, Subscription, TaskId,
    TaskInstance, TaskStatus,
};
use tally_storage::{DeleteMode, EntityStore, EventedEntityStore, FlakyStore, MemoryStore};

/// Convenience alias for the fully-typed test runtime.
pub(crate) type TestRuntime = Runtime<FakeExecutor, FakeNotifyAdapter, FakeClock, SequentialIdGen>;

/// Test context holding the runtime, its fakes, and the raw stores.
pub(crate) struct TestContext {
    pub runtime: TestRuntime,
    pub clock: FakeClock,
    pub actions: FakeExecutor,
    pub notifier: FakeNotifyAdapter,
    pub bus: EventBus,
    /// Task store under the evented wrapper, for failure injection.
    pub tasks: Arc<FlakyStore<TaskInstance>>,
    pub jobs: Arc<MemoryStore<JobDescriptor>>,
    /// Every bus event since setup.
    pub events: Subscription,
}

/// Fast retries so exhaustion tests stay quick.
pub(crate) fn test_config() -> RuntimeConfig {
    RuntimeConfig {
        retry: RetryPolicy {
            attempts: 3,
            base_delay: Duration::from_millis(1),
            multiplier: 2.0,
        },
        store_timeout: Duration::from_secs(1),
        ..RuntimeConfig::default()
    }
}

pub(crate) fn setup() -> TestContext {
    setup_with(test_config())
}

pub(crate) fn setup_with(config: RuntimeConfig) -> TestContext {
    let bus = EventBus::new();
    let events = bus.subscribe(KindFilter::All);
    let stores = (
        Arc::new(FlakyStore::new(DeleteMode::Lenient)),
        Arc::new(MemoryStore::new(DeleteMode::Strict)),
    );
    build(config, bus, events, stores, FakeClock::new(), "run")
}

/// A second runtime over the same stores and clock, as after a restart.
///
/// New instances get `rerun-N` ids so they never collide with the first run's.
pub(crate) fn restart(ctx: &TestContext, config: RuntimeConfig) -> TestContext {
    let events = ctx.bus.subscribe(KindFilter::All);
    let stores = (Arc::clone(&ctx.tasks), Arc::clone(&ctx.jobs));
    build(config, ctx.bus.clone(), events, stores, ctx.clock.clone(), "rerun")
}

type Stores = (
    Arc<FlakyStore<TaskInstance>>,
    Arc<MemoryStore<JobDescriptor>>,
);

fn build(
    config: RuntimeConfig,
    bus: EventBus,
    events: Subscription,
    (tasks, jobs): Stores,
    clock: FakeClock,
    id_prefix: &str,
) -> TestContext {
    let actions = FakeExecutor::new();
    let notifier = FakeNotifyAdapter::new();
    let runtime = Runtime::new(
        RuntimeDeps {
            actions: actions.clone(),
            notifier: notifier.clone(),
            bus: bus.clone(),
            jobs: Arc::new(EventedEntityStore::new(Arc::clone(&jobs), bus.clone())),
            tasks: Arc::new(EventedEntityStore::new(Arc::clone(&tasks), bus.clone())),
            ids: SequentialIdGen::new(id_prefix),
        },
        clock.clone(),
        config,
    );
    TestContext {
        runtime,
        clock,
        actions,
        notifier,
        bus,
        tasks,
        jobs,
        events,
    }
}

impl TestContext {
    pub async fn define(&mut self, job: JobDescriptor) {
        self.runtime.define_jobs(vec![job]).await.unwrap();
    }

    /// Publish-free delivery of an event of `kind` to the runtime.
    pub async fn fire(&mut self, kind: &str) {
        self.runtime.handle_event(bare_event(kind)).await;
    }

    pub async fn deliver(&mut self, event: Event) {
        self.runtime.handle_event(event).await;
    }

    /// Report the action behind `handle` as finished.
    pub async fn complete(&mut self, handle: &ActionHandle, success: bool) {
        let message = if success { None } else { Some("exit status 1") };
        self.deliver(FakeExecutor::completion(handle, success, message))
            .await;
    }

    /// Complete the most recent dispatch successfully.
    pub async fn complete_last(&mut self) {
        let handle = self.actions.last_handle().unwrap();
        self.complete(&handle, true).await;
    }

    /// Advance time and run one tick.
    pub async fn advance(&mut self, by: Duration) {
        self.clock.advance(by);
        self.runtime.tick().await;
    }

    pub fn dispatched(&self) -> Vec<DispatchRequest> {
        self.actions
            .dispatched()
            .into_iter()
            .map(|(_, r)| r)
            .collect()
    }

    pub async fn stored(&self, id: &TaskId) -> TaskInstance {
        self.tasks.get(id.as_str()).await.unwrap().unwrap()
    }

    /// Every stored instance of `job`, oldest first.
    pub async fn stored_for(&self, job: &str) -> Vec<TaskInstance> {
        let mut tasks: Vec<TaskInstance> = self
            .tasks
            .all()
            .await
            .unwrap()
            .iter()
            .filter(|t| t.job_id == job)
            .cloned()
            .collect();
        tasks.sort_by_key(|t| (t.created_at_ms, t.id.clone()));
        tasks
    }

    pub fn status(&self, id: &TaskId) -> Option<TaskStatus> {
        self.runtime.live_task(id).map(|t| t.status)
    }

    /// Ids of live instances of `job`.
    pub fn live_for(&self, job: &str) -> Vec<TaskId> {
        self.runtime
            .live_tasks()
            .filter(|t| t.job_id == job)
            .map(|t| t.id.clone())
            .collect()
    }

    /// Kinds of the bus events seen since the last call.
    pub fn event_kinds(&mut self) -> Vec<String> {
        self.events.drain().into_iter().map(|e| e.kind).collect()
    }
}
