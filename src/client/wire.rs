// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! JSON shapes served by the log-cache HTTP gateway
//!
//! The gateway renders protobuf messages as JSON: 64-bit integers may arrive
//! as strings and log payloads are base64. These DTOs absorb that and convert
//! into the domain types.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Deserializer};
use std::collections::{BTreeSet, HashMap};

use crate::envelope::{Envelope, GaugeValue, LogType, Payload};
use crate::group::{ShardGroup, SubGroup};

#[derive(Deserialize)]
#[serde(untagged)]
enum IntOrString {
    Int(i64),
    Unsigned(u64),
    Float(f64),
    Str(String),
}

fn de_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    match IntOrString::deserialize(deserializer)? {
        IntOrString::Int(v) => Ok(v),
        IntOrString::Unsigned(v) => i64::try_from(v).map_err(serde::de::Error::custom),
        IntOrString::Float(v) => Ok(v as i64),
        IntOrString::Str(s) if s.is_empty() => Ok(0),
        IntOrString::Str(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

fn to_u64<E: serde::de::Error>(value: IntOrString) -> Result<u64, E> {
    match value {
        IntOrString::Int(i) => u64::try_from(i).map_err(E::custom),
        IntOrString::Unsigned(u) => Ok(u),
        IntOrString::Float(f) => Ok(f as u64),
        IntOrString::Str(s) if s.is_empty() => Ok(0),
        IntOrString::Str(s) => s.parse().map_err(E::custom),
    }
}

fn de_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    to_u64(IntOrString::deserialize(deserializer)?)
}

fn de_u64_set<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BTreeSet<u64>, D::Error> {
    let raw: Vec<IntOrString> = Vec::deserialize(deserializer)?;
    raw.into_iter().map(to_u64).collect()
}

/// Body of a read response: `{"envelopes": {"batch": [...]}}`
#[derive(Debug, Deserialize, Default)]
pub struct ReadResponse {
    #[serde(default)]
    pub envelopes: WireBatch,
}

#[derive(Debug, Deserialize, Default)]
pub struct WireBatch {
    #[serde(default)]
    pub batch: Vec<WireEnvelope>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEnvelope {
    #[serde(default, deserialize_with = "de_i64")]
    pub timestamp: i64,
    #[serde(default)]
    pub source_id: String,
    #[serde(default)]
    pub instance_id: String,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    pub log: Option<WireLog>,
    pub counter: Option<WireCounter>,
    pub gauge: Option<WireGauge>,
    pub timer: Option<WireTimer>,
    pub event: Option<WireEvent>,
}

#[derive(Debug, Deserialize)]
pub struct WireLog {
    #[serde(default)]
    pub payload: String,
    #[serde(rename = "type", default)]
    pub log_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WireCounter {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "de_u64")]
    pub delta: u64,
    #[serde(default, deserialize_with = "de_u64")]
    pub total: u64,
}

#[derive(Debug, Deserialize)]
pub struct WireGauge {
    #[serde(default)]
    pub metrics: HashMap<String, WireGaugeValue>,
}

#[derive(Debug, Deserialize)]
pub struct WireGaugeValue {
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub value: f64,
}

#[derive(Debug, Deserialize)]
pub struct WireTimer {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "de_i64")]
    pub start: i64,
    #[serde(default, deserialize_with = "de_i64")]
    pub stop: i64,
}

#[derive(Debug, Deserialize)]
pub struct WireEvent {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
}

impl TryFrom<WireEnvelope> for Envelope {
    type Error = String;

    fn try_from(wire: WireEnvelope) -> Result<Self, Self::Error> {
        let payload = if let Some(log) = wire.log {
            let bytes = BASE64
                .decode(log.payload.as_bytes())
                .map_err(|e| format!("invalid log payload encoding: {}", e))?;
            let log_type = match log.log_type.as_deref() {
                Some("ERR") => LogType::Err,
                _ => LogType::Out,
            };
            Payload::Log {
                payload: bytes,
                log_type,
            }
        } else if let Some(counter) = wire.counter {
            Payload::Counter {
                name: counter.name,
                delta: counter.delta,
                total: counter.total,
            }
        } else if let Some(gauge) = wire.gauge {
            Payload::Gauge {
                metrics: gauge
                    .metrics
                    .into_iter()
                    .map(|(name, v)| {
                        (
                            name,
                            GaugeValue {
                                unit: v.unit,
                                value: v.value,
                            },
                        )
                    })
                    .collect(),
            }
        } else if let Some(timer) = wire.timer {
            Payload::Timer {
                name: timer.name,
                start: timer.start,
                stop: timer.stop,
            }
        } else if let Some(event) = wire.event {
            Payload::Event {
                title: event.title,
                body: event.body,
            }
        } else {
            return Err(format!(
                "envelope from {} at {} has no payload",
                wire.source_id, wire.timestamp
            ));
        };

        Ok(Envelope {
            source_id: wire.source_id,
            instance_id: wire.instance_id,
            timestamp: wire.timestamp,
            tags: wire.tags,
            payload,
        })
    }
}

impl ReadResponse {
    pub fn into_page(self) -> Result<Vec<Envelope>, String> {
        self.envelopes
            .batch
            .into_iter()
            .map(Envelope::try_from)
            .collect()
    }
}

/// Per-source entry of the meta response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SourceMeta {
    #[serde(default, deserialize_with = "de_u64")]
    pub count: u64,
    #[serde(default, deserialize_with = "de_u64")]
    pub expired: u64,
    #[serde(default, deserialize_with = "de_i64")]
    pub oldest_timestamp: i64,
    #[serde(default, deserialize_with = "de_i64")]
    pub newest_timestamp: i64,
}

#[derive(Debug, Deserialize, Default)]
pub struct MetaResponse {
    #[serde(default)]
    pub meta: HashMap<String, SourceMeta>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WireSubGroup {
    #[serde(default)]
    pub source_ids: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WireShardGroup {
    #[serde(default)]
    pub sub_groups: Vec<WireSubGroup>,
    #[serde(default, deserialize_with = "de_u64_set")]
    pub requester_ids: BTreeSet<u64>,
}

impl WireShardGroup {
    pub fn into_shard_group(self, name: &str) -> ShardGroup {
        ShardGroup {
            name: name.to_string(),
            sub_groups: self
                .sub_groups
                .into_iter()
                .map(|sg| SubGroup::new(sg.source_ids))
                .collect(),
            requester_ids: self.requester_ids,
        }
    }
}

/// Body of a shard group declaration
#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetShardGroupRequest<'a> {
    pub source_ids: &'a [String],
    pub requester_id: u64,
}

/// Prometheus-style query envelope
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    #[serde(default)]
    pub status: String,
    pub data: Option<QueryData>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryData {
    pub result_type: String,
    pub result: serde_json::Value,
}
