// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Bearer token sources for the log-cache gateway

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::config::UaaCredentials;

/// Tokens are refreshed this long before the server says they expire
const EXPIRY_MARGIN: Duration = Duration::from_secs(30);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    #[error("token request failed: {0}")]
    Transport(String),

    #[error("token endpoint returned {code}: {body}")]
    Rejected { code: u16, body: String },

    #[error("invalid token response: {0}")]
    Decode(String),
}

/// Supplies the value of the `Authorization` header
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<String, AuthError>;
}

/// A fixed, pre-issued token
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn token(&self) -> Result<String, AuthError> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    #[serde(default)]
    expires_in: u64,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

struct CachedToken {
    header: String,
    refresh_at: Instant,
}

/// OAuth2 client-credentials grant against a UAA server
pub struct UaaTokenSource {
    token_url: String,
    client_id: String,
    client_secret: String,
    client: Client,
    cached: Mutex<Option<CachedToken>>,
}

impl UaaTokenSource {
    pub fn new(credentials: UaaCredentials, client: Client) -> Self {
        Self {
            token_url: format!("{}/oauth/token", credentials.url.trim_end_matches('/')),
            client_id: credentials.client_id,
            client_secret: credentials.client_secret,
            client,
            cached: Mutex::new(None),
        }
    }

    async fn fetch(&self) -> Result<CachedToken, AuthError> {
        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header("Accept", "application/json")
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Rejected {
                code: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Decode(e.to_string()))?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(EXPIRY_MARGIN);
        debug!(
            client_id = %self.client_id,
            expires_in = token.expires_in,
            "Fetched UAA token"
        );

        Ok(CachedToken {
            header: format!("{} {}", token.token_type.to_lowercase(), token.access_token),
            refresh_at: Instant::now() + lifetime,
        })
    }
}

#[async_trait]
impl TokenSource for UaaTokenSource {
    async fn token(&self) -> Result<String, AuthError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.header.clone());
            }
        }

        let fresh = self.fetch().await?;
        let header = fresh.header.clone();
        *cached = Some(fresh);
        Ok(header)
    }
}
