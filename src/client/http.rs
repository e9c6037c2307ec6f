// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP client for the log-cache gateway
//!
//! Reads source streams and shard groups, serves meta and PromQL passthrough,
//! and declares shard group memberships.

use async_trait::async_trait;
use reqwest::{Certificate, Client, Identity, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::auth::{TokenSource, UaaTokenSource};
use super::error::ClientError;
use super::query::QueryResult;
use super::wire::{
    MetaResponse, QueryResponse, ReadResponse, SetShardGroupRequest, SourceMeta, WireShardGroup,
};
use crate::config::{Config, DEFAULT_TIMEOUT};
use crate::envelope::{Page, TimeRange};
use crate::group::{GroupError, ShardGroup, ShardGroupClient};
use crate::walk::{PageReader, ReadError, ReadOptions};

/// Parse `addr` as a base URL; bare `host:port` is taken as plain HTTP
pub fn base_url(addr: &str) -> Result<Url, ClientError> {
    let addr = addr.trim();
    let full = if addr.contains("://") {
        addr.to_string()
    } else {
        format!("http://{}", addr)
    };
    let url = Url::parse(&full).map_err(|e| ClientError::InvalidAddress(format!("{}: {}", addr, e)))?;
    if url.cannot_be_a_base() {
        return Err(ClientError::InvalidAddress(addr.to_string()));
    }
    Ok(url)
}

#[derive(Clone)]
pub struct LogCacheClient {
    base: Url,
    client: Client,
    timeout: Duration,
    tokens: Option<Arc<dyn TokenSource>>,
}

impl std::fmt::Debug for LogCacheClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogCacheClient")
            .field("base", &self.base.as_str())
            .field("timeout", &self.timeout)
            .field("authenticated", &self.tokens.is_some())
            .finish()
    }
}

impl LogCacheClient {
    /// Plain client with the default request timeout
    pub fn new(addr: &str) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Tls(e.to_string()))?;
        Self::with_http_client(addr, client, DEFAULT_TIMEOUT)
    }

    pub fn with_http_client(
        addr: &str,
        client: Client,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            base: base_url(addr)?,
            client,
            timeout,
            tokens: None,
        })
    }

    /// Build from configuration: TLS material, request timeout and UAA credentials
    pub fn from_config(config: &Config) -> Result<Self, ClientError> {
        let mut builder = Client::builder().timeout(config.default_timeout);

        if let Some(ca_path) = &config.ca_path {
            let pem = std::fs::read(ca_path)
                .map_err(|e| ClientError::Tls(format!("{}: {}", ca_path.display(), e)))?;
            let ca = Certificate::from_pem(&pem).map_err(|e| ClientError::Tls(e.to_string()))?;
            builder = builder.add_root_certificate(ca);
        }

        if let (Some(cert_path), Some(key_path)) = (&config.cert_path, &config.key_path) {
            let mut pem = std::fs::read(cert_path)
                .map_err(|e| ClientError::Tls(format!("{}: {}", cert_path.display(), e)))?;
            let key = std::fs::read(key_path)
                .map_err(|e| ClientError::Tls(format!("{}: {}", key_path.display(), e)))?;
            pem.extend_from_slice(&key);
            let identity = Identity::from_pem(&pem).map_err(|e| ClientError::Tls(e.to_string()))?;
            builder = builder.identity(identity);
        }

        if config.skip_cert_verify {
            warn!("TLS certificate verification disabled for log-cache client");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|e| ClientError::Tls(e.to_string()))?;

        let mut log_cache =
            Self::with_http_client(&config.log_cache_addr, client.clone(), config.default_timeout)?;
        if let Some(credentials) = config.uaa_credentials() {
            log_cache = log_cache.with_token_source(Arc::new(UaaTokenSource::new(credentials, client)));
        }
        Ok(log_cache)
    }

    pub fn with_token_source(mut self, tokens: Arc<dyn TokenSource>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Reader for a shard group on behalf of `requester_id`
    pub fn group_reader(&self, requester_id: u64) -> GroupReader {
        GroupReader {
            client: self.clone(),
            requester_id,
        }
    }

    /// One page of envelopes for `source_id`
    pub async fn read(
        &self,
        source_id: &str,
        range: TimeRange,
        options: &ReadOptions,
    ) -> Result<Page, ClientError> {
        let url = self.endpoint(&["api", "v1", "read", source_id])?;
        let params = read_params(range, options);
        let response: ReadResponse = self.get_json(url, &params).await?;
        let page = response.into_page().map_err(ClientError::Decode)?;
        debug!(source_id = %source_id, start = range.start, envelopes = page.len(), "Read page");
        Ok(page)
    }

    /// Retention statistics for every source the store holds
    pub async fn meta(&self) -> Result<HashMap<String, SourceMeta>, ClientError> {
        let url = self.endpoint(&["api", "v1", "meta"])?;
        let response: MetaResponse = self.get_json(url, &[]).await?;
        Ok(response.meta)
    }

    /// Instant PromQL query
    pub async fn promql(&self, query: &str) -> Result<QueryResult, ClientError> {
        let url = self.endpoint(&["api", "v1", "query"])?;
        let params = vec![("query", query.to_string())];
        let response: QueryResponse = self.get_json(url, &params).await?;
        query_result(response)
    }

    /// Range PromQL query; `start` and `end` are unix seconds
    pub async fn promql_range(
        &self,
        query: &str,
        start: f64,
        end: f64,
        step: Duration,
    ) -> Result<QueryResult, ClientError> {
        let url = self.endpoint(&["api", "v1", "query_range"])?;
        let params = vec![
            ("query", query.to_string()),
            ("start", start.to_string()),
            ("end", end.to_string()),
            ("step", format!("{}s", step.as_secs_f64())),
        ];
        let response: QueryResponse = self.get_json(url, &params).await?;
        query_result(response)
    }

    async fn read_group(
        &self,
        group_name: &str,
        requester_id: u64,
        range: TimeRange,
        options: &ReadOptions,
    ) -> Result<Page, ClientError> {
        let url = self.endpoint(&["api", "v1", "shard_group", group_name])?;
        let mut params = read_params(range, options);
        params.push(("requester_id", requester_id.to_string()));
        let response: ReadResponse = self.get_json(url, &params).await?;
        response.into_page().map_err(ClientError::Decode)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidAddress(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        params: &[(&str, String)],
    ) -> Result<T, ClientError> {
        let response = self.send(self.client.get(url).query(params)).await?;
        response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let mut request = request.header("Accept", "application/json");
        if let Some(tokens) = &self.tokens {
            request = request.header("Authorization", tokens.token().await?);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ClientError::Timeout {
                    timeout_ms: self.timeout.as_millis() as u64,
                }
            } else {
                ClientError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                code: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

fn read_params(range: TimeRange, options: &ReadOptions) -> Vec<(&'static str, String)> {
    let mut params = vec![("start_time", range.start.to_string())];
    if !range.is_open_ended() {
        params.push(("end_time", range.end.to_string()));
    }
    if let Some(limit) = options.limit {
        params.push(("limit", limit.to_string()));
    }
    for envelope_type in &options.envelope_types {
        params.push(("envelope_types", envelope_type.as_str().to_string()));
    }
    params
}

fn query_result(response: QueryResponse) -> Result<QueryResult, ClientError> {
    if response.status != "success" {
        return Err(ClientError::Query(
            response
                .error
                .unwrap_or_else(|| format!("query status {}", response.status)),
        ));
    }
    let data = response
        .data
        .ok_or_else(|| ClientError::Decode("query response has no data".to_string()))?;
    QueryResult::from_data(data).map_err(ClientError::Decode)
}

#[async_trait]
impl PageReader for LogCacheClient {
    async fn read_page(
        &self,
        subject: &str,
        range: TimeRange,
        options: &ReadOptions,
    ) -> Result<Page, ReadError> {
        self.read(subject, range, options).await.map_err(ReadError::from)
    }
}

#[async_trait]
impl ShardGroupClient for LogCacheClient {
    async fn declare(
        &self,
        group_name: &str,
        source_ids: &[String],
        requester_id: u64,
    ) -> Result<(), GroupError> {
        if group_name.is_empty() || source_ids.is_empty() {
            return Err(GroupError::InvalidRequest(
                "group name and source ids are required".to_string(),
            ));
        }

        let url = self.endpoint(&["api", "v1", "shard_group", group_name])?;
        let body = SetShardGroupRequest {
            source_ids,
            requester_id,
        };
        self.send(self.client.put(url).json(&body)).await?;
        debug!(group = %group_name, ?source_ids, requester_id, "Declared shard group membership");
        Ok(())
    }

    async fn describe(&self, group_name: &str) -> Result<ShardGroup, GroupError> {
        let url = self.endpoint(&["api", "v1", "shard_group", group_name, "meta"])?;
        match self.get_json::<WireShardGroup>(url, &[]).await {
            Ok(group) => Ok(group.into_shard_group(group_name)),
            Err(ClientError::Status { code, .. }) if code == StatusCode::NOT_FOUND.as_u16() => {
                Err(GroupError::NotFound(group_name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Reads a shard group as one requester
///
/// Subgroups are dealt out across the requesters in the group, so each
/// requester sees only its share of the group's sources.
#[derive(Debug, Clone)]
pub struct GroupReader {
    client: LogCacheClient,
    requester_id: u64,
}

impl GroupReader {
    pub fn requester_id(&self) -> u64 {
        self.requester_id
    }
}

#[async_trait]
impl PageReader for GroupReader {
    async fn read_page(
        &self,
        subject: &str,
        range: TimeRange,
        options: &ReadOptions,
    ) -> Result<Page, ReadError> {
        self.client
            .read_group(subject, self.requester_id, range, options)
            .await
            .map_err(ReadError::from)
    }
}
