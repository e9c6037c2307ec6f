// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Client for the log emitter used to seed test traffic
//!
//! The emitter writes a fixed batch of logs or gauges for each requested
//! source id. Callers then give the store time to ingest them before reading.

use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use crate::client::{base_url, ClientError};
use crate::config::Config;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmitError {
    #[error("Invalid emitter address: {0}")]
    InvalidAddress(String),

    #[error("No source ids to emit for")]
    NoSources,

    #[error("Emit request failed: {0}")]
    Transport(String),

    #[error("Emitter returned status {code}: {body}")]
    Status { code: u16, body: String },

    #[error("Cancelled while waiting for emitted envelopes")]
    Cancelled,
}

impl From<ClientError> for EmitError {
    fn from(err: ClientError) -> Self {
        EmitError::InvalidAddress(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EmitKind {
    Logs,
    Gauges,
}

impl EmitKind {
    fn path(self) -> &'static str {
        match self {
            EmitKind::Logs => "emit-logs",
            EmitKind::Gauges => "emit-gauges",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogEmitter {
    base: Url,
    client: Client,
    propagation_delay: Duration,
}

impl LogEmitter {
    pub fn new(addr: &str, propagation_delay: Duration) -> Result<Self, EmitError> {
        Ok(Self {
            base: base_url(addr)?,
            client: Client::new(),
            propagation_delay,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, EmitError> {
        Self::new(&config.log_emitter_addr, config.wait_for_logs_timeout)
    }

    pub fn propagation_delay(&self) -> Duration {
        self.propagation_delay
    }

    /// Ask the emitter to write logs for every source id
    pub async fn emit_logs(&self, source_ids: &[String]) -> Result<(), EmitError> {
        self.emit(EmitKind::Logs, source_ids).await
    }

    /// Ask the emitter to write gauges for every source id
    pub async fn emit_gauges(&self, source_ids: &[String]) -> Result<(), EmitError> {
        self.emit(EmitKind::Gauges, source_ids).await
    }

    /// Sleep for the propagation delay unless cancelled first
    pub async fn wait_for_propagation(&self, token: &CancellationToken) -> Result<(), EmitError> {
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(EmitError::Cancelled),
            _ = tokio::time::sleep(self.propagation_delay) => Ok(()),
        }
    }

    /// Emit logs, then wait for them to become readable
    pub async fn emit_logs_and_wait(
        &self,
        token: &CancellationToken,
        source_ids: &[String],
    ) -> Result<(), EmitError> {
        self.emit_logs(source_ids).await?;
        self.wait_for_propagation(token).await
    }

    pub async fn emit_gauges_and_wait(
        &self,
        token: &CancellationToken,
        source_ids: &[String],
    ) -> Result<(), EmitError> {
        self.emit_gauges(source_ids).await?;
        self.wait_for_propagation(token).await
    }

    async fn emit(&self, kind: EmitKind, source_ids: &[String]) -> Result<(), EmitError> {
        if source_ids.is_empty() {
            return Err(EmitError::NoSources);
        }

        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| EmitError::InvalidAddress(self.base.to_string()))?
            .pop_if_empty()
            .push(kind.path());
        {
            let mut query = url.query_pairs_mut();
            for source_id in source_ids {
                query.append_pair("sourceIDs", source_id);
            }
        }

        debug!(url = %url, "Emitting test traffic");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| EmitError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmitError::Status {
                code: status.as_u16(),
                body,
            });
        }

        info!(kind = kind.path(), sources = source_ids.len(), "Emitted test traffic");
        Ok(())
    }
}
