// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Page reader trait definition

use async_trait::async_trait;
use std::sync::Arc;

use super::error::ReadError;
use crate::envelope::{EnvelopeType, Page, TimeRange};

/// Per-read parameters forwarded to the store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Only return these payload kinds; empty means all
    pub envelope_types: Vec<EnvelopeType>,
    /// Maximum envelopes per page; `None` leaves it to the store
    pub limit: Option<usize>,
}

/// Fetches one page of envelopes for a subject
///
/// A subject is a source id or a shard group name. Implementations return
/// envelopes in `[range.start, range.end)` in ascending timestamp order; an
/// empty page means nothing is available in range yet and is not an error.
#[async_trait]
pub trait PageReader: Send + Sync {
    async fn read_page(
        &self,
        subject: &str,
        range: TimeRange,
        options: &ReadOptions,
    ) -> Result<Page, ReadError>;
}

#[async_trait]
impl<T: PageReader + ?Sized> PageReader for Arc<T> {
    async fn read_page(
        &self,
        subject: &str,
        range: TimeRange,
        options: &ReadOptions,
    ) -> Result<Page, ReadError> {
        (**self).read_page(subject, range, options).await
    }
}

#[async_trait]
impl<T: PageReader + ?Sized> PageReader for &T {
    async fn read_page(
        &self,
        subject: &str,
        range: TimeRange,
        options: &ReadOptions,
    ) -> Result<Page, ReadError> {
        (**self).read_page(subject, range, options).await
    }
}
