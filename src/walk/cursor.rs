// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Walker read position and attempt bookkeeping

use crate::envelope::{Page, TimeRange};

/// Mutable position of one walk
///
/// `position` is the next timestamp to read. It only moves forward, and only
/// past envelopes that were actually handed out, so nothing is delivered
/// twice and nothing inside the range is skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    position: i64,
    end: i64,
    attempts: u32,
    empty_attempts: u32,
    delivered: usize,
    pages: u64,
}

impl Cursor {
    pub fn new(range: TimeRange) -> Self {
        Self {
            position: range.start,
            end: range.end,
            attempts: 0,
            empty_attempts: 0,
            delivered: 0,
            pages: 0,
        }
    }

    pub fn position(&self) -> i64 {
        self.position
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    /// Range still left to read
    pub fn window(&self) -> TimeRange {
        TimeRange::new(self.position, self.end)
    }

    pub fn is_exhausted(&self) -> bool {
        self.position >= self.end
    }

    /// Consecutive failed reads since the last delivered page
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Consecutive empty reads, when empty pages are budgeted separately
    pub fn empty_attempts(&self) -> u32 {
        self.empty_attempts
    }

    pub fn delivered(&self) -> usize {
        self.delivered
    }

    pub fn pages(&self) -> u64 {
        self.pages
    }

    /// Keep the part of `page` that lies in the unread window and move past it
    ///
    /// Envelopes before the cursor (already delivered) or at/after the end are
    /// dropped; the rest are ordered by timestamp. Returns the retained
    /// envelopes, which may be empty. The attempt counters are left alone;
    /// the walker resets them once the page has been handed out.
    pub fn advance(&mut self, mut page: Page) -> Page {
        let window = self.window();
        page.retain(|e| window.contains(e.timestamp));
        page.sort_by_key(|e| e.timestamp);

        if let Some(last) = page.last() {
            self.position = last.timestamp.saturating_add(1);
            self.delivered += page.len();
            self.pages += 1;
        }
        page
    }

    pub fn record_failure(&mut self) -> u32 {
        self.attempts = self.attempts.saturating_add(1);
        self.attempts
    }

    pub fn record_empty_separately(&mut self) -> u32 {
        self.empty_attempts = self.empty_attempts.saturating_add(1);
        self.empty_attempts
    }

    pub fn reset_attempts(&mut self) {
        self.attempts = 0;
        self.empty_attempts = 0;
    }
}
