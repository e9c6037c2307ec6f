// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Half-open time ranges over envelope timestamps

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Half-open range `[start, end)` in nanoseconds since the Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
}

impl TimeRange {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Range with no upper bound; a walk over it only ends on stop, cancel or exhaustion
    pub fn since(start: i64) -> Self {
        Self {
            start,
            end: i64::MAX,
        }
    }

    pub fn from_times(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self::new(to_nanos(start), to_nanos(end))
    }

    pub fn is_valid(&self) -> bool {
        self.start <= self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn is_open_ended(&self) -> bool {
        self.end == i64::MAX
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        self.start <= timestamp && timestamp < self.end
    }

    /// Same end, new start
    pub fn starting_at(&self, start: i64) -> Self {
        Self {
            start,
            end: self.end,
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_open_ended() {
            write!(f, "[{}, ..)", self.start)
        } else {
            write!(f, "[{}, {})", self.start, self.end)
        }
    }
}

/// Nanoseconds since the epoch, saturating outside the i64 range (~year 2262)
pub fn to_nanos(time: DateTime<Utc>) -> i64 {
    time.timestamp_nanos_opt().unwrap_or(if time.timestamp() < 0 {
        i64::MIN
    } else {
        i64::MAX
    })
}

pub fn now_nanos() -> i64 {
    to_nanos(Utc::now())
}
