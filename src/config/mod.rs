// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Runtime configuration
//!
//! Built once from the environment or a TOML file and passed by reference.

use serde::{Deserialize, Deserializer};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::utils::duration::parse_duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_WAIT_FOR_LOGS_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_GROUP_REFRESH_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_DECLARE_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
}

/// UAA client credentials
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UaaCredentials {
    pub url: String,
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base address of the log-cache HTTP gateway
    pub log_cache_addr: String,
    /// Address of the log emitter used to seed test traffic
    pub log_emitter_addr: String,

    pub ca_path: Option<PathBuf>,
    pub cert_path: Option<PathBuf>,
    pub key_path: Option<PathBuf>,
    pub skip_cert_verify: bool,

    pub uaa_url: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,

    /// Per-request timeout for store reads
    #[serde(deserialize_with = "de_duration")]
    pub default_timeout: Duration,
    /// How long emitted traffic is given to propagate before reading
    #[serde(deserialize_with = "de_duration")]
    pub wait_for_logs_timeout: Duration,
    #[serde(deserialize_with = "de_duration")]
    pub group_refresh_interval: Duration,
    #[serde(deserialize_with = "de_duration")]
    pub declare_timeout: Duration,
}

fn de_duration<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Secs(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Secs(secs) => Ok(Duration::from_secs(secs)),
        Raw::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_cache_addr: String::new(),
            log_emitter_addr: String::new(),
            ca_path: None,
            cert_path: None,
            key_path: None,
            skip_cert_verify: false,
            uaa_url: None,
            client_id: None,
            client_secret: None,
            default_timeout: DEFAULT_TIMEOUT,
            wait_for_logs_timeout: DEFAULT_WAIT_FOR_LOGS_TIMEOUT,
            group_refresh_interval: DEFAULT_GROUP_REFRESH_INTERVAL,
            declare_timeout: DEFAULT_DECLARE_TIMEOUT,
        }
    }
}

impl Config {
    /// Load configuration from environment variables and validate it
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; `from_env` uses the process environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let duration = |key: &'static str, default: Duration| -> Result<Duration, ConfigError> {
            match get(key) {
                Some(raw) => {
                    parse_duration(&raw).map_err(|reason| ConfigError::Invalid { key, reason })
                }
                None => Ok(default),
            }
        };

        let skip_cert_verify = match get("SKIP_CERT_VERIFY") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::Invalid {
                key: "SKIP_CERT_VERIFY",
                reason: format!("expected a boolean, got '{}'", raw),
            })?,
            None => false,
        };

        let config = Self {
            log_cache_addr: get("LOG_CACHE_ADDR").unwrap_or_default(),
            log_emitter_addr: get("LOG_EMITTER_ADDR").unwrap_or_default(),
            ca_path: get("CA_PATH").map(PathBuf::from),
            cert_path: get("CERT_PATH").map(PathBuf::from),
            key_path: get("KEY_PATH").map(PathBuf::from),
            skip_cert_verify,
            uaa_url: get("UAA_URL"),
            client_id: get("CLIENT_ID"),
            client_secret: get("CLIENT_SECRET"),
            default_timeout: duration("DEFAULT_TIMEOUT", DEFAULT_TIMEOUT)?,
            wait_for_logs_timeout: duration(
                "WAIT_FOR_LOGS_TIMEOUT",
                DEFAULT_WAIT_FOR_LOGS_TIMEOUT,
            )?,
            group_refresh_interval: duration(
                "GROUP_REFRESH_INTERVAL",
                DEFAULT_GROUP_REFRESH_INTERVAL,
            )?,
            declare_timeout: duration("DECLARE_TIMEOUT", DEFAULT_DECLARE_TIMEOUT)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file and validate it
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_cache_addr.trim().is_empty() {
            return Err(ConfigError::Missing("LOG_CACHE_ADDR"));
        }
        if self.log_emitter_addr.trim().is_empty() {
            return Err(ConfigError::Missing("LOG_EMITTER_ADDR"));
        }

        // Client certificate and key only make sense together
        if self.cert_path.is_some() != self.key_path.is_some() {
            return Err(ConfigError::Invalid {
                key: "CERT_PATH",
                reason: "CERT_PATH and KEY_PATH must be set together".to_string(),
            });
        }

        let uaa_parts = [
            self.uaa_url.is_some(),
            self.client_id.is_some(),
            self.client_secret.is_some(),
        ];
        if uaa_parts.iter().any(|p| *p) && !uaa_parts.iter().all(|p| *p) {
            return Err(ConfigError::Invalid {
                key: "UAA_URL",
                reason: "UAA_URL, CLIENT_ID and CLIENT_SECRET must be set together".to_string(),
            });
        }

        for (key, value) in [
            ("DEFAULT_TIMEOUT", self.default_timeout),
            ("GROUP_REFRESH_INTERVAL", self.group_refresh_interval),
            ("DECLARE_TIMEOUT", self.declare_timeout),
        ] {
            if value.is_zero() {
                return Err(ConfigError::Invalid {
                    key,
                    reason: "must be greater than 0".to_string(),
                });
            }
        }

        Ok(())
    }

    /// UAA credentials when all three settings are present
    pub fn uaa_credentials(&self) -> Option<UaaCredentials> {
        match (&self.uaa_url, &self.client_id, &self.client_secret) {
            (Some(url), Some(client_id), Some(client_secret)) => Some(UaaCredentials {
                url: url.clone(),
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
            }),
            _ => None,
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
