// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error types for paginated reads and walks

use thiserror::Error;

/// Failure of a single page read
///
/// Every variant is treated as transient by the walker and retried under the
/// configured backoff policy.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReadError {
    /// Connection-level failure (refused, reset, DNS, TLS)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Store answered with a non-success status
    #[error("Store returned status {code}: {body}")]
    Status { code: u16, body: String },

    /// Response body could not be decoded
    #[error("Failed to decode page: {0}")]
    Decode(String),

    /// Read did not complete within the per-read timeout
    #[error("Read timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

/// Terminal failure of a walk
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WalkError {
    /// Backoff policy refused another attempt
    ///
    /// `last_error` is `None` when the budget was spent on empty pages.
    /// Pages already delivered are not rolled back.
    #[error(
        "Retry budget exhausted for {subject} at cursor {cursor} after {attempts} attempts \
         ({delivered} envelopes delivered){}",
        cause_suffix(.last_error)
    )]
    RetryExhausted {
        subject: String,
        cursor: i64,
        attempts: u32,
        delivered: usize,
        last_error: Option<ReadError>,
    },

    /// Cancellation token fired; never retried
    #[error("Walk of {subject} cancelled at cursor {cursor} ({delivered} envelopes delivered)")]
    Cancelled {
        subject: String,
        cursor: i64,
        delivered: usize,
    },

    /// Range start lies after its end
    #[error("Invalid time range: start {start} is after end {end}")]
    InvalidRange { start: i64, end: i64 },
}

fn cause_suffix(cause: &Option<ReadError>) -> String {
    cause.as_ref().map(|e| format!(": {}", e)).unwrap_or_default()
}

impl WalkError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, WalkError::Cancelled { .. })
    }

    pub fn is_retry_exhausted(&self) -> bool {
        matches!(self, WalkError::RetryExhausted { .. })
    }

    /// Envelopes handed to the caller before the walk failed
    pub fn delivered(&self) -> usize {
        match self {
            WalkError::RetryExhausted { delivered, .. } | WalkError::Cancelled { delivered, .. } => {
                *delivered
            }
            WalkError::InvalidRange { .. } => 0,
        }
    }
}
