// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Stopping a maintainer in the middle of a refresh round

use async_trait::async_trait;
use logcache_walk::group::{GroupError, GroupMaintainer, MaintainerState, ShardGroup, ShardGroupClient};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Each declare takes `latency`; records when every call started
struct SlowClient {
    latency: Duration,
    started: Mutex<Vec<(Instant, Vec<String>)>>,
}

#[async_trait]
impl ShardGroupClient for SlowClient {
    async fn declare(
        &self,
        _group_name: &str,
        source_ids: &[String],
        _requester_id: u64,
    ) -> Result<(), GroupError> {
        self.started
            .lock()
            .unwrap()
            .push((Instant::now(), source_ids.to_vec()));
        tokio::time::sleep(self.latency).await;
        Ok(())
    }

    async fn describe(&self, group_name: &str) -> Result<ShardGroup, GroupError> {
        Err(GroupError::NotFound(group_name.to_string()))
    }
}

#[tokio::test(start_paused = true)]
async fn test_cancel_mid_tick_stops_within_one_interval() {
    let client = Arc::new(SlowClient {
        latency: Duration::from_millis(100),
        started: Mutex::new(Vec::new()),
    });
    let interval = Duration::from_secs(1);
    let sources: Vec<String> = ["s1", "s2", "s3"].iter().map(|s| s.to_string()).collect();
    let token = CancellationToken::new();
    let start = Instant::now();

    let handle = GroupMaintainer::new("g", &sources, 1, client.clone())
        .with_interval(interval)
        .spawn(token.clone());

    // Second round begins at 1s; its first declare is in flight at 1.05s
    tokio::time::sleep(Duration::from_millis(1_050)).await;
    assert_eq!(handle.state(), MaintainerState::Running);
    let cancelled_at = Instant::now();
    let report = handle.stop().await.unwrap();

    assert!(Instant::now() - cancelled_at < interval);

    let started = client.started.lock().unwrap().clone();
    assert_eq!(started.len(), 4);
    assert!(started.iter().all(|(at, _)| *at <= cancelled_at));
    assert_eq!(started[3].0 - start, Duration::from_secs(1));
    assert_eq!(report.ticks, 2);
    assert_eq!(report.declared, 4);

    // Nothing else happens after stop returns
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(client.started.lock().unwrap().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_state_transitions_published() {
    use futures::StreamExt;

    let client = Arc::new(SlowClient {
        latency: Duration::ZERO,
        started: Mutex::new(Vec::new()),
    });
    let token = CancellationToken::new();
    let maintainer = GroupMaintainer::new("g", &["s1".to_string()], 1, client)
        .with_interval(Duration::from_secs(1));
    assert_eq!(maintainer.state(), MaintainerState::Idle);

    let handle = maintainer.spawn(token.clone());
    let mut changes = handle.state_changes();
    tokio::time::sleep(Duration::from_millis(10)).await;

    token.cancel();
    let mut last = None;
    while let Some(state) = changes.next().await {
        last = Some(state);
        if state == MaintainerState::Stopped {
            break;
        }
    }
    assert_eq!(last, Some(MaintainerState::Stopped));
    assert_eq!(handle.state(), MaintainerState::Stopped);
}
