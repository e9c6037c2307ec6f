// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Draining a store whose writes propagate with jitter

use super::support::SyntheticStore;
use logcache_walk::envelope::TimeRange;
use logcache_walk::walk::{walk, RetryBackoff, WalkEnd, WalkOptions};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test(start_paused = true)]
async fn test_drains_ten_thousand_envelopes_with_jitter() {
    let store = Arc::new(SyntheticStore::new(
        "app-1",
        10_000,
        1_000,
        Duration::from_millis(250),
        42,
    ));
    let token = CancellationToken::new();
    let options = WalkOptions::new()
        .with_backoff(RetryBackoff::new(Duration::from_millis(50), 100))
        .with_limit(1_000);

    let mut seen = HashSet::new();
    let mut received = 0usize;
    let summary = walk(
        &token,
        "app-1",
        TimeRange::new(0, 20_000),
        store.clone(),
        options,
        |page| {
            assert!(page.len() <= 1_000);
            for envelope in &page {
                assert!(seen.insert(envelope.timestamp), "duplicate {}", envelope.timestamp);
            }
            received += page.len();
            received < 10_000
        },
    )
    .await
    .expect("walk should succeed");

    assert!(received >= 9_900, "received only {}", received);
    assert_eq!(summary.delivered, received);
    assert_eq!(summary.end, WalkEnd::Stopped);
    assert!(store.read_count() >= 10);
}

#[tokio::test(start_paused = true)]
async fn test_exhausts_range_when_consumer_never_stops() {
    let store = SyntheticStore::new("app-1", 2_500, 1_000, Duration::ZERO, 7);
    let token = CancellationToken::new();

    let mut pages = 0;
    let summary = walk(
        &token,
        "app-1",
        TimeRange::new(1, 2_501),
        &store,
        WalkOptions::new(),
        |_| {
            pages += 1;
            true
        },
    )
    .await
    .unwrap();

    assert_eq!(pages, 3);
    assert_eq!(summary.delivered, 2_500);
    assert_eq!(summary.end, WalkEnd::RangeExhausted);
    assert_eq!(summary.cursor, 2_501);
}

#[tokio::test(start_paused = true)]
async fn test_other_sources_are_not_delivered() {
    let store = SyntheticStore::new("app-1", 100, 1_000, Duration::ZERO, 1);
    let token = CancellationToken::new();

    let result = walk(
        &token,
        "app-2",
        TimeRange::new(0, 200),
        &store,
        WalkOptions::new().with_backoff(RetryBackoff::new(Duration::from_millis(10), 3)),
        |_| panic!("no pages expected"),
    )
    .await;

    let err = result.unwrap_err();
    assert!(err.is_retry_exhausted());
    assert_eq!(err.delivered(), 0);
}
