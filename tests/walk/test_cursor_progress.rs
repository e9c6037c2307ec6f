// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Cursor only moves forward and never re-delivers

use super::support::{ScriptedReader, SyntheticStore};
use futures::StreamExt;
use logcache_walk::envelope::{Envelope, TimeRange};
use logcache_walk::walk::{Walker, WalkOptions};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test(start_paused = true)]
async fn test_requested_windows_strictly_advance() {
    let store = SyntheticStore::new("app-1", 3_000, 500, Duration::ZERO, 3);
    let token = CancellationToken::new();

    let mut walker = Walker::new(
        "app-1",
        TimeRange::new(1, 3_001),
        &store,
        WalkOptions::new(),
        token,
    )
    .unwrap();

    let mut last_position = walker.cursor().position();
    while let Some(page) = walker.next_page().await {
        let page = page.unwrap();
        let position = walker.cursor().position();
        assert!(position > last_position);
        assert!(page.iter().all(|e| e.timestamp >= last_position && e.timestamp < position));
        last_position = position;
    }

    let windows = store.windows.lock().unwrap().clone();
    assert_eq!(windows.len(), 6);
    assert!(windows.windows(2).all(|w| w[1].start > w[0].start));
}

#[tokio::test(start_paused = true)]
async fn test_out_of_window_and_stale_envelopes_dropped() {
    // A misbehaving store repeats an already-delivered envelope and leaks one
    // past the end of the range
    let reader = ScriptedReader::new(vec![
        Ok(vec![Envelope::log("app-1", 3, "a"), Envelope::log("app-1", 4, "b")]),
        Ok(vec![
            Envelope::log("app-1", 4, "b"),
            Envelope::log("app-1", 6, "c"),
            Envelope::log("app-1", 50, "late"),
        ]),
    ]);
    let token = CancellationToken::new();

    let pages: Vec<_> = Walker::new("app-1", TimeRange::new(0, 10), reader, WalkOptions::new(), token)
        .unwrap()
        .into_stream()
        .take(2)
        .collect()
        .await;

    let timestamps: Vec<Vec<i64>> = pages
        .into_iter()
        .map(|p| p.unwrap().iter().map(|e| e.timestamp).collect())
        .collect();
    assert_eq!(timestamps, vec![vec![3, 4], vec![6]]);
}
