// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Envelope data model
//!
//! Envelopes are produced by the external store and consumed read-only.
//! Timestamps are nanoseconds since the Unix epoch throughout the crate.

pub mod range;
pub mod types;

pub use range::TimeRange;
pub use types::{Envelope, EnvelopeType, GaugeValue, LogType, Page, Payload};
