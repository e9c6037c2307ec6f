// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// One parent token shutting down a walk and a maintainer together

use async_trait::async_trait;
use futures::StreamExt;
use logcache_walk::envelope::{Page, TimeRange};
use logcache_walk::group::{GroupMaintainer, MaintainerState, MemoryShardGroups};
use logcache_walk::walk::{walk, PageReader, ReadError, ReadOptions, WalkError, WalkOptions};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Never answers
#[derive(Default)]
struct StalledReader {
    calls: AtomicUsize,
}

#[async_trait]
impl PageReader for StalledReader {
    async fn read_page(
        &self,
        _subject: &str,
        _range: TimeRange,
        _options: &ReadOptions,
    ) -> Result<Page, ReadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

#[tokio::test(start_paused = true)]
async fn test_parent_cancel_stops_walk_and_maintainer() {
    let parent = CancellationToken::new();
    let store = Arc::new(MemoryShardGroups::new());
    let sources: Vec<String> = ["s1", "s2"].iter().map(|s| s.to_string()).collect();

    let handle = GroupMaintainer::new("g", &sources, 1, store.clone())
        .with_interval(Duration::from_secs(1))
        .spawn(parent.child_token());

    let reader = Arc::new(StalledReader::default());
    let walk_token = parent.child_token();
    let walk_reader = reader.clone();
    let walking = tokio::spawn(async move {
        walk(&walk_token, "s1", TimeRange::new(0, 100), walk_reader, WalkOptions::new(), |_| true).await
    });

    tokio::time::sleep(Duration::from_millis(2_500)).await;
    assert_eq!(handle.state(), MaintainerState::Running);
    assert_eq!(store.declaration_count("g"), 2);

    let cancelled_at = Instant::now();
    parent.cancel();

    let err = walking.await.unwrap().unwrap_err();
    assert!(matches!(err, WalkError::Cancelled { .. }));
    assert_eq!(reader.calls.load(Ordering::SeqCst), 1);

    let mut changes = handle.state_changes();
    while handle.state() != MaintainerState::Stopped {
        changes.next().await;
    }
    assert_eq!(Instant::now(), cancelled_at);

    let declared = handle.stats().declared;
    assert_eq!(declared, 6);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(handle.stats().declared, declared);
    assert_eq!(handle.stop().await.unwrap().declared, declared);
}
