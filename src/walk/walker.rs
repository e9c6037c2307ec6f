// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Paginated walk over a subject's time range
//!
//! The walker pulls pages from a [`PageReader`], advancing its cursor past
//! every delivered envelope. Failed reads and empty pages are retried under
//! the configured backoff policy; cancellation is observed while a read is
//! in flight and while a backoff delay is pending.
//!
//! Two entry points are provided:
//! - [`Walker::next_page`] / [`Walker::into_stream`] for pull-based consumers
//! - [`walk`] for callback consumers that decide after each page whether to
//!   continue

use futures::Stream;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::cursor::Cursor;
use super::error::{ReadError, WalkError};
use super::options::WalkOptions;
use super::reader::PageReader;
use crate::envelope::{Page, TimeRange};

/// Why a walk ended successfully
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkEnd {
    /// The cursor reached the end of the range
    RangeExhausted,
    /// The caller's predicate asked to stop
    Stopped,
}

/// Final state of a successful walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkSummary {
    pub subject: String,
    pub cursor: i64,
    pub delivered: usize,
    pub pages: u64,
    pub end: WalkEnd,
}

/// Pull-based, single-use page sequence over `[start, end)` of one subject
///
/// Once the walker has returned `None` or an error it stays finished.
pub struct Walker<R> {
    subject: String,
    reader: R,
    options: WalkOptions,
    cursor: Cursor,
    token: CancellationToken,
    last_error: Option<ReadError>,
    finished: bool,
}

impl<R: PageReader> Walker<R> {
    pub fn new(
        subject: impl Into<String>,
        range: TimeRange,
        reader: R,
        options: WalkOptions,
        token: CancellationToken,
    ) -> Result<Self, WalkError> {
        if !range.is_valid() {
            return Err(WalkError::InvalidRange {
                start: range.start,
                end: range.end,
            });
        }

        Ok(Self {
            subject: subject.into(),
            reader,
            options,
            cursor: Cursor::new(range),
            token,
            last_error: None,
            finished: false,
        })
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn summary(&self, end: WalkEnd) -> WalkSummary {
        WalkSummary {
            subject: self.subject.clone(),
            cursor: self.cursor.position(),
            delivered: self.cursor.delivered(),
            pages: self.cursor.pages(),
            end,
        }
    }

    /// Next non-empty page, `None` once the range is exhausted
    ///
    /// Retries failed and empty reads of the same window until the backoff
    /// policy gives up, in which case `RetryExhausted` is returned.
    pub async fn next_page(&mut self) -> Option<Result<Page, WalkError>> {
        if self.finished {
            return None;
        }

        loop {
            if self.cursor.is_exhausted() {
                self.finished = true;
                debug!(
                    subject = %self.subject,
                    cursor = self.cursor.position(),
                    "Walk reached end of range"
                );
                return None;
            }

            let window = self.cursor.window();
            let result = match self.fetch(window).await {
                Some(result) => result,
                None => return Some(Err(self.cancelled())),
            };

            let delay = match result {
                Ok(page) => {
                    let page = self.cursor.advance(page);
                    if !page.is_empty() {
                        debug!(
                            subject = %self.subject,
                            envelopes = page.len(),
                            cursor = self.cursor.position(),
                            "Page delivered"
                        );
                        self.cursor.reset_attempts();
                        self.last_error = None;
                        return Some(Ok(page));
                    }
                    match self.on_empty() {
                        Ok(delay) => delay,
                        Err(err) => return Some(Err(err)),
                    }
                }
                Err(err) => match self.on_failure(err) {
                    Ok(delay) => delay,
                    Err(err) => return Some(Err(err)),
                },
            };

            if !self.wait(delay).await {
                return Some(Err(self.cancelled()));
            }
        }
    }

    /// Convert into a `Stream` of pages
    pub fn into_stream(self) -> impl Stream<Item = Result<Page, WalkError>> {
        futures::stream::unfold(self, |mut walker| async move {
            walker.next_page().await.map(|item| (item, walker))
        })
    }

    /// One read of `window`; `None` if cancelled first
    async fn fetch(&self, window: TimeRange) -> Option<Result<Page, ReadError>> {
        if self.token.is_cancelled() {
            return None;
        }

        let read = self
            .reader
            .read_page(&self.subject, window, &self.options.read);

        let timed = async {
            match self.options.read_timeout {
                Some(limit) => match tokio::time::timeout(limit, read).await {
                    Ok(result) => result,
                    Err(_) => Err(ReadError::Timeout {
                        timeout_ms: limit.as_millis() as u64,
                    }),
                },
                None => read.await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => None,
            result = timed => Some(result),
        }
    }

    fn on_failure(&mut self, err: ReadError) -> Result<Duration, WalkError> {
        let attempt = self.cursor.record_failure();
        let decision = self.options.backoff.decide(attempt);
        warn!(
            subject = %self.subject,
            cursor = self.cursor.position(),
            attempt,
            max_attempts = self.options.backoff.max_attempts(),
            error = %err,
            "Page read failed"
        );
        self.last_error = Some(err);

        if decision.retry {
            Ok(decision.delay)
        } else {
            Err(self.exhausted(attempt))
        }
    }

    fn on_empty(&mut self) -> Result<Duration, WalkError> {
        let (attempt, decision) = match &self.options.empty_backoff {
            Some(policy) => {
                let attempt = self.cursor.record_empty_separately();
                (attempt, policy.decide(attempt))
            }
            None => {
                let attempt = self.cursor.record_failure();
                (attempt, self.options.backoff.decide(attempt))
            }
        };
        debug!(
            subject = %self.subject,
            cursor = self.cursor.position(),
            attempt,
            "Empty page"
        );

        if decision.retry {
            Ok(decision.delay)
        } else {
            Err(self.exhausted(attempt))
        }
    }

    /// Sleep for `delay`; false if cancelled first
    async fn wait(&self, delay: Duration) -> bool {
        if delay.is_zero() {
            return !self.token.is_cancelled();
        }
        tokio::select! {
            biased;
            _ = self.token.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }

    fn exhausted(&mut self, attempts: u32) -> WalkError {
        self.finished = true;
        let err = WalkError::RetryExhausted {
            subject: self.subject.clone(),
            cursor: self.cursor.position(),
            attempts,
            delivered: self.cursor.delivered(),
            last_error: self.last_error.take(),
        };
        info!(subject = %self.subject, error = %err, "Walk gave up");
        err
    }

    fn cancelled(&mut self) -> WalkError {
        self.finished = true;
        info!(
            subject = %self.subject,
            cursor = self.cursor.position(),
            delivered = self.cursor.delivered(),
            "Walk cancelled"
        );
        WalkError::Cancelled {
            subject: self.subject.clone(),
            cursor: self.cursor.position(),
            delivered: self.cursor.delivered(),
        }
    }
}

/// Walk `subject` over `range`, handing each page to `f` until it returns false
///
/// Ends successfully when `f` returns false or the range is exhausted. Pages
/// delivered before a failure are not rolled back.
pub async fn walk<R, F>(
    token: &CancellationToken,
    subject: &str,
    range: TimeRange,
    reader: R,
    options: WalkOptions,
    mut f: F,
) -> Result<WalkSummary, WalkError>
where
    R: PageReader,
    F: FnMut(Page) -> bool,
{
    let mut walker = Walker::new(subject, range, reader, options, token.clone())?;

    while let Some(page) = walker.next_page().await {
        if !f(page?) {
            let summary = walker.summary(WalkEnd::Stopped);
            info!(
                subject = %summary.subject,
                delivered = summary.delivered,
                cursor = summary.cursor,
                "Walk stopped by consumer"
            );
            return Ok(summary);
        }
    }

    let summary = walker.summary(WalkEnd::RangeExhausted);
    info!(
        subject = %summary.subject,
        delivered = summary.delivered,
        "Walk completed"
    );
    Ok(summary)
}
