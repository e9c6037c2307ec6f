// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error types for shard group membership

use thiserror::Error;

/// Failure of a single `declare` or `describe` call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GroupError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Shard group API returned status {code}: {body}")]
    Status { code: u16, body: String },

    #[error("Failed to decode shard group response: {0}")]
    Decode(String),

    #[error("Shard group call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// No live memberships exist for the group
    #[error("Shard group not found: {0}")]
    NotFound(String),

    #[error("Invalid shard group request: {0}")]
    InvalidRequest(String),
}

/// A declaration the maintainer could not refresh
///
/// Reported per entry; never stops the maintainer loop.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Failed to declare {source_ids:?} in group {group} for requester {requester_id}: {source}")]
pub struct MembershipDeclareError {
    pub group: String,
    pub source_ids: Vec<String>,
    pub requester_id: u64,
    #[source]
    pub source: GroupError,
}
