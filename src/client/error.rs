// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error types for the log-cache HTTP client

use thiserror::Error;

use super::auth::AuthError;
use crate::group::GroupError;
use crate::walk::ReadError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("TLS setup failed: {0}")]
    Tls(String),

    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Log cache returned status {code}: {body}")]
    Status { code: u16, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Query failed: {0}")]
    Query(String),
}

impl From<ClientError> for ReadError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Status { code, body } => ReadError::Status { code, body },
            ClientError::Decode(msg) => ReadError::Decode(msg),
            ClientError::Timeout { timeout_ms } => ReadError::Timeout { timeout_ms },
            other => ReadError::Transport(other.to_string()),
        }
    }
}

impl From<ClientError> for GroupError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Status { code, body } => GroupError::Status { code, body },
            ClientError::Decode(msg) => GroupError::Decode(msg),
            ClientError::Timeout { timeout_ms } => GroupError::Timeout { timeout_ms },
            ClientError::InvalidAddress(msg) => GroupError::InvalidRequest(msg),
            other => GroupError::Transport(other.to_string()),
        }
    }
}
