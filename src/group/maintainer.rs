// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Background refresh of shard group memberships
//!
//! The server forgets a membership that is not re-declared within its TTL.
//! A [`GroupMaintainer`] re-declares a fixed set of entries for one requester
//! on every tick until it is cancelled. A failing entry is logged, counted and
//! forwarded to an optional failure sink; it never stops the other entries or
//! later ticks.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle ──run/spawn──► Running ──cancel──► Stopped
//! ```
//!
//! `run` consumes the maintainer, so a stopped maintainer cannot be restarted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::client::ShardGroupClient;
use super::error::{GroupError, MembershipDeclareError};
use crate::utils::periodic::PeriodicTask;

/// Default pause between refresh rounds
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

/// Default bound on a single declare call
pub const DEFAULT_DECLARE_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaintainerState {
    Idle,
    Running,
    Stopped,
}

/// Live counters shared with handles
#[derive(Debug, Default)]
pub struct MaintainerStats {
    ticks: AtomicU64,
    declared: AtomicU64,
    failures: AtomicU64,
}

impl MaintainerStats {
    pub fn snapshot(&self) -> MaintainerReport {
        MaintainerReport {
            ticks: self.ticks.load(Ordering::SeqCst),
            declared: self.declared.load(Ordering::SeqCst),
            failures: self.failures.load(Ordering::SeqCst),
        }
    }
}

/// Point-in-time copy of [`MaintainerStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaintainerReport {
    /// Refresh rounds started
    pub ticks: u64,
    /// Successful declare calls
    pub declared: u64,
    /// Failed declare calls
    pub failures: u64,
}

/// Periodically re-declares a requester's memberships in one group
pub struct GroupMaintainer {
    group_name: String,
    entries: Vec<Vec<String>>,
    requester_id: u64,
    client: Arc<dyn ShardGroupClient>,
    interval: Duration,
    declare_timeout: Duration,
    failure_sink: Option<mpsc::UnboundedSender<MembershipDeclareError>>,
    state: watch::Sender<MaintainerState>,
    stats: Arc<MaintainerStats>,
}

impl GroupMaintainer {
    /// Maintain one single-source membership per id in `source_ids`
    pub fn new(
        group_name: impl Into<String>,
        source_ids: &[String],
        requester_id: u64,
        client: Arc<dyn ShardGroupClient>,
    ) -> Self {
        let entries = source_ids.iter().map(|id| vec![id.clone()]).collect();
        Self::with_entries(group_name, entries, requester_id, client)
    }

    /// Maintain one membership per entry; each entry is a set of source ids
    pub fn with_entries(
        group_name: impl Into<String>,
        entries: Vec<Vec<String>>,
        requester_id: u64,
        client: Arc<dyn ShardGroupClient>,
    ) -> Self {
        let (state, _) = watch::channel(MaintainerState::Idle);
        Self {
            group_name: group_name.into(),
            entries,
            requester_id,
            client,
            interval: DEFAULT_REFRESH_INTERVAL,
            declare_timeout: DEFAULT_DECLARE_TIMEOUT,
            failure_sink: None,
            state,
            stats: Arc::new(MaintainerStats::default()),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_declare_timeout(mut self, timeout: Duration) -> Self {
        self.declare_timeout = timeout;
        self
    }

    /// Forward every failed declaration to `sink`
    pub fn with_failure_sink(mut self, sink: mpsc::UnboundedSender<MembershipDeclareError>) -> Self {
        self.failure_sink = Some(sink);
        self
    }

    pub fn group_name(&self) -> &str {
        &self.group_name
    }

    pub fn requester_id(&self) -> u64 {
        self.requester_id
    }

    pub fn state(&self) -> MaintainerState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<MaintainerState> {
        self.state.subscribe()
    }

    pub fn stats(&self) -> Arc<MaintainerStats> {
        self.stats.clone()
    }

    /// Refresh memberships until `token` is cancelled
    pub async fn run(self, token: CancellationToken) -> MaintainerReport {
        self.state.send_replace(MaintainerState::Running);
        info!(
            group = %self.group_name,
            requester_id = self.requester_id,
            entries = self.entries.len(),
            interval_ms = self.interval.as_millis() as u64,
            "Group maintainer started"
        );

        let task = PeriodicTask::new(format!("maintain-{}", self.group_name), self.interval);
        task.run(&token, |tick| self.refresh(&token, tick)).await;

        self.state.send_replace(MaintainerState::Stopped);
        let report = self.stats.snapshot();
        info!(
            group = %self.group_name,
            ticks = report.ticks,
            declared = report.declared,
            failures = report.failures,
            "Group maintainer stopped"
        );
        report
    }

    /// Run on a background task
    pub fn spawn(self, token: CancellationToken) -> MaintainerHandle {
        let state = self.subscribe();
        let stats = self.stats();
        let join = tokio::spawn(self.run(token.clone()));
        MaintainerHandle {
            state,
            stats,
            token,
            join,
        }
    }

    /// One round: declare every entry, checking for cancellation between calls
    async fn refresh(&self, token: &CancellationToken, tick: u64) {
        self.stats.ticks.fetch_add(1, Ordering::SeqCst);

        for source_ids in &self.entries {
            if token.is_cancelled() {
                debug!(group = %self.group_name, tick, "Refresh interrupted by cancellation");
                return;
            }

            match self.declare_once(source_ids).await {
                Ok(()) => {
                    self.stats.declared.fetch_add(1, Ordering::SeqCst);
                }
                Err(source) => {
                    self.stats.failures.fetch_add(1, Ordering::SeqCst);
                    let err = MembershipDeclareError {
                        group: self.group_name.clone(),
                        source_ids: source_ids.clone(),
                        requester_id: self.requester_id,
                        source,
                    };
                    warn!(tick, error = %err, "Unable to set shard group");
                    if let Some(sink) = &self.failure_sink {
                        let _ = sink.send(err);
                    }
                }
            }
        }
    }

    async fn declare_once(&self, source_ids: &[String]) -> Result<(), GroupError> {
        let call = self
            .client
            .declare(&self.group_name, source_ids, self.requester_id);
        match tokio::time::timeout(self.declare_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(GroupError::Timeout {
                timeout_ms: self.declare_timeout.as_millis() as u64,
            }),
        }
    }
}

/// Handle to a spawned maintainer
pub struct MaintainerHandle {
    state: watch::Receiver<MaintainerState>,
    stats: Arc<MaintainerStats>,
    token: CancellationToken,
    join: JoinHandle<MaintainerReport>,
}

impl MaintainerHandle {
    pub fn state(&self) -> MaintainerState {
        *self.state.borrow()
    }

    pub fn state_changes(&self) -> WatchStream<MaintainerState> {
        WatchStream::new(self.state.clone())
    }

    pub fn stats(&self) -> MaintainerReport {
        self.stats.snapshot()
    }

    /// Cancel the maintainer and wait for it to stop
    pub async fn stop(self) -> Result<MaintainerReport, tokio::task::JoinError> {
        self.token.cancel();
        self.join.await
    }
}

/// Keep `source_ids` declared under `group_name` until `token` is cancelled
///
/// Each source id is declared as its own membership every `interval`.
pub async fn maintain_group(
    token: &CancellationToken,
    group_name: &str,
    source_ids: &[String],
    requester_id: u64,
    client: Arc<dyn ShardGroupClient>,
    interval: Duration,
) -> MaintainerReport {
    GroupMaintainer::new(group_name, source_ids, requester_id, client)
        .with_interval(interval)
        .run(token.clone())
        .await
}
