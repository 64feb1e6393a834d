// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded retries for store writes.

use std::future::Future;
use std::time::Duration;
use tally_storage::StoreError;

/// Exponential backoff for persistence failures.
///
/// `delay = base_delay * multiplier^(attempt - 1)` between attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total tries, including the first.
    pub attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(100),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay after the `attempt`-th failure (1-indexed).
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay.as_secs_f64();
        let secs = base * self.multiplier.powi(attempt.saturating_sub(1) as i32);
        Duration::try_from_secs_f64(secs).unwrap_or(self.base_delay)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// Each try is bounded by `timeout`; an elapsed try counts as a
    /// transient [`StoreError::Timeout`].
    pub async fn run<F, Fut>(
        &self,
        op_name: &'static str,
        timeout: Duration,
        mut op: F,
    ) -> Result<(), StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), StoreError>>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = match tokio::time::timeout(timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(StoreError::Timeout {
                    op: op_name,
                    after: timeout,
                }),
            };
            match result {
                Ok(()) => return Ok(()),
                Err(e) if e.is_transient() && attempt < attempts => {
                    let delay = self.next_delay(attempt);
                    tracing::warn!(
                        op = op_name,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "store write failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
