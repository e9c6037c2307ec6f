// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Envelope counting on top of [`walk`]
//!
//! The walker knows nothing about envelope contents; this consumer folds pages
//! into a running tally and stops once a target is reached.

use tokio_util::sync::CancellationToken;

use super::error::WalkError;
use super::options::WalkOptions;
use super::reader::PageReader;
use super::walker::{walk, WalkSummary};
use crate::envelope::{Envelope, TimeRange};

/// Running totals of a counting walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnvelopeTally {
    /// Every envelope delivered
    pub received: usize,
    /// Envelopes accepted by the matcher (equals `received` without one)
    pub matched: usize,
}

/// Tally plus how the walk ended
///
/// The tally is kept even when the walk failed, since partial delivery is
/// still meaningful to the caller.
#[derive(Debug)]
pub struct CountReport {
    pub tally: EnvelopeTally,
    pub outcome: Result<WalkSummary, WalkError>,
}

impl CountReport {
    /// Count the caller cares about: matched if a matcher was used, else received
    pub fn count(&self) -> usize {
        self.tally.matched
    }
}

/// Matcher accepting log envelopes whose payload contains `needle`
pub fn log_contains(needle: impl Into<String>) -> impl Fn(&Envelope) -> bool + Send + Sync {
    let needle = needle.into();
    move |envelope| {
        envelope
            .log_text()
            .map(|text| text.contains(&needle))
            .unwrap_or(false)
    }
}

/// Walk `subject` until `target` matching envelopes have been seen
///
/// Without a matcher every envelope matches.
pub async fn count_envelopes<R, M>(
    token: &CancellationToken,
    reader: R,
    subject: &str,
    range: TimeRange,
    options: WalkOptions,
    target: usize,
    matcher: Option<M>,
) -> CountReport
where
    R: PageReader,
    M: Fn(&Envelope) -> bool,
{
    let mut tally = EnvelopeTally::default();

    let outcome = walk(token, subject, range, reader, options, |page| {
        tally.received += page.len();
        tally.matched += match &matcher {
            Some(matches) => page.iter().filter(|e| matches(e)).count(),
            None => page.len(),
        };
        tally.matched < target
    })
    .await;

    CountReport { tally, outcome }
}
