// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tally-core: domain model for the Tally job orchestration engine

pub mod bus;
pub mod clock;
pub mod effect;
pub mod event;
pub mod id;
pub mod job;
pub mod schedule;
pub mod task;
pub mod time_fmt;
pub mod timer;
pub mod traced;
pub mod trigger;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use bus::{EventBus, KindFilter, PublishError, Subscription};
pub use clock::{Clock, FakeClock, SystemClock};
pub use effect::Effect;
pub use event::{kinds, ActionCompleted, CollectRequested, Event, OperatorAlert};
pub use id::{IdGen, SequentialIdGen, ShortId, UuidIdGen};
pub use job::{JobDescriptor, JobId, StepAction, StepDef, SurpassBehaviour, ValidationError};
pub use schedule::{Schedule, TriggerConfigError};
pub use task::{
    Progress, StepOutcome, StepResult, TaskId, TaskInstance, TaskStatus, TransitionError,
    WaitOutcome,
};
pub use time_fmt::{format_elapsed, format_elapsed_ms, parse_duration};
pub use timer::{TimerId, TimerKind};
pub use traced::TracedEffect;
pub use trigger::{Stimulus, TriggerSpec, WaitSpec};
