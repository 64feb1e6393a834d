// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for external I/O: action executors and operator notifiers

pub mod executor;
pub mod notify;
pub mod subprocess;
pub mod traced;

pub use executor::{
    ActionExecutor, ActionHandle, CollectExecutor, DispatchError, DispatchRequest,
    RoutingExecutor, ShellConfig, ShellExecutor,
};
pub use notify::{BusNotifyAdapter, NotifyAdapter, NotifyError};
pub use traced::{TracedExecutor, TracedNotify};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use executor::{ExecutorCall, FakeExecutor};
#[cfg(any(test, feature = "test-support"))]
pub use notify::FakeNotifyAdapter;
