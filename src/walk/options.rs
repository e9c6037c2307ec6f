// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Walk configuration

use std::sync::Arc;
use std::time::Duration;

use super::backoff::{BackoffPolicy, RetryBackoff};
use super::reader::ReadOptions;
use crate::envelope::EnvelopeType;

/// Options for a single walk
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Policy applied after failed reads (and empty pages, unless `empty_backoff` is set)
    pub backoff: Arc<dyn BackoffPolicy>,
    /// Separate budget for empty pages
    ///
    /// When set, empty pages are counted against this policy with their own
    /// counter instead of sharing the failure budget.
    pub empty_backoff: Option<Arc<dyn BackoffPolicy>>,
    /// Forwarded to every read
    pub read: ReadOptions,
    /// Upper bound on a single read; a timeout counts as a failed read
    pub read_timeout: Option<Duration>,
}

impl WalkOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backoff(mut self, policy: impl BackoffPolicy + 'static) -> Self {
        self.backoff = Arc::new(policy);
        self
    }

    pub fn with_empty_backoff(mut self, policy: impl BackoffPolicy + 'static) -> Self {
        self.empty_backoff = Some(Arc::new(policy));
        self
    }

    pub fn with_envelope_types(mut self, types: impl IntoIterator<Item = EnvelopeType>) -> Self {
        self.read.envelope_types = types.into_iter().collect();
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.read.limit = Some(limit);
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            backoff: Arc::new(RetryBackoff::default()),
            empty_backoff: None,
            read: ReadOptions::default(),
            read_timeout: None,
        }
    }
}
