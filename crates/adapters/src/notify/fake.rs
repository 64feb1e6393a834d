// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake notification adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{NotifyAdapter, NotifyError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tally_core::OperatorAlert;

#[derive(Default)]
struct FakeNotifyState {
    calls: Vec<OperatorAlert>,
    fail: bool,
}

/// Fake notification adapter for testing
#[derive(Clone, Default)]
pub struct FakeNotifyAdapter {
    inner: Arc<Mutex<FakeNotifyState>>,
}

impl FakeNotifyAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded alerts
    pub fn calls(&self) -> Vec<OperatorAlert> {
        self.inner.lock().calls.clone()
    }

    /// Make every later call fail after recording it.
    pub fn set_failing(&self, fail: bool) {
        self.inner.lock().fail = fail;
    }
}

#[async_trait]
impl NotifyAdapter for FakeNotifyAdapter {
    async fn notify(&self, alert: &OperatorAlert) -> Result<(), NotifyError> {
        let mut inner = self.inner.lock();
        inner.calls.push(alert.clone());
        if inner.fail {
            return Err(NotifyError::SendFailed("fake failure".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
