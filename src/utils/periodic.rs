// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Cancellable periodic task
//!
//! Runs a unit of work immediately and then once per interval until the
//! cancellation token fires. Cancellation is observed at tick boundaries; a
//! unit of work that has started is allowed to finish.

use std::future::Future;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Smallest interval accepted; `tokio::time::interval` rejects zero
const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone)]
pub struct PeriodicTask {
    name: String,
    interval: Duration,
}

impl PeriodicTask {
    pub fn new(name: impl Into<String>, interval: Duration) -> Self {
        Self {
            name: name.into(),
            interval: interval.max(MIN_INTERVAL),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run `work(tick)` until cancelled, returning the number of completed ticks
    ///
    /// Slow work delays the following tick instead of triggering a burst of
    /// catch-up ticks.
    pub async fn run<F, Fut>(&self, token: &CancellationToken, mut work: F) -> u64
    where
        F: FnMut(u64) -> Fut,
        Fut: Future<Output = ()>,
    {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = 0u64;

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            work(ticks).await;
            ticks += 1;
        }

        debug!(task = %self.name, ticks, "Periodic task stopped");
        ticks
    }
}
