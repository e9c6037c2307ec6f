// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Reliable draining of a time-windowed, paginated event store
//!
//! - [`backoff`]: pure retry policies
//! - [`cursor`]: read position and attempt bookkeeping
//! - [`walker`]: the retrying page loop, as a pull sequence or callback walk
//! - [`count`]: counting consumer built on the walk

pub mod backoff;
pub mod count;
pub mod cursor;
pub mod error;
pub mod options;
pub mod reader;
pub mod walker;

pub use backoff::{BackoffDecision, BackoffPolicy, Growth, RetryBackoff};
pub use count::{count_envelopes, log_contains, CountReport, EnvelopeTally};
pub use cursor::Cursor;
pub use error::{ReadError, WalkError};
pub use options::WalkOptions;
pub use reader::{PageReader, ReadOptions};
pub use walker::{walk, WalkEnd, WalkSummary, Walker};
