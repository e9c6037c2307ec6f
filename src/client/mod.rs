// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Log-cache HTTP gateway client

pub mod auth;
pub mod error;
pub mod http;
pub mod query;
pub mod wire;

pub use auth::{AuthError, StaticToken, TokenSource, UaaTokenSource};
pub use error::ClientError;
pub use http::{base_url, GroupReader, LogCacheClient};
pub use query::{Point, QueryResult, Sample, Series};
pub use wire::SourceMeta;
