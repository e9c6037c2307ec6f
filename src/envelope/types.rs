// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Core envelope types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// One timestamped event or metric sample tied to a source id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Source id the envelope was emitted under
    pub source_id: String,
    /// Instance of the source (app index, VM id, ...)
    #[serde(default)]
    pub instance_id: String,
    /// Nanoseconds since the Unix epoch
    pub timestamp: i64,
    /// Free-form tags attached by the emitter
    #[serde(default)]
    pub tags: HashMap<String, String>,
    /// Typed payload
    pub payload: Payload,
}

impl Envelope {
    /// Create an envelope with no tags and an empty instance id
    pub fn new(source_id: impl Into<String>, timestamp: i64, payload: Payload) -> Self {
        Self {
            source_id: source_id.into(),
            instance_id: String::new(),
            timestamp,
            tags: HashMap::new(),
            payload,
        }
    }

    /// Shorthand for a stdout log envelope
    pub fn log(source_id: impl Into<String>, timestamp: i64, line: impl Into<Vec<u8>>) -> Self {
        Self::new(
            source_id,
            timestamp,
            Payload::Log {
                payload: line.into(),
                log_type: LogType::Out,
            },
        )
    }

    /// Shorthand for a single-metric gauge envelope
    pub fn gauge(
        source_id: impl Into<String>,
        timestamp: i64,
        name: impl Into<String>,
        value: f64,
    ) -> Self {
        let mut metrics = HashMap::new();
        metrics.insert(
            name.into(),
            GaugeValue {
                unit: String::new(),
                value,
            },
        );
        Self::new(source_id, timestamp, Payload::Gauge { metrics })
    }

    pub fn envelope_type(&self) -> EnvelopeType {
        self.payload.envelope_type()
    }

    /// Log line as UTF-8 text, lossy; `None` for non-log payloads
    pub fn log_text(&self) -> Option<String> {
        match &self.payload {
            Payload::Log { payload, .. } => Some(String::from_utf8_lossy(payload).into_owned()),
            _ => None,
        }
    }
}

/// Log stream an envelope was written to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogType {
    #[default]
    Out,
    Err,
}

/// Single gauge reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaugeValue {
    pub unit: String,
    pub value: f64,
}

/// Typed envelope payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Payload {
    Log {
        payload: Vec<u8>,
        log_type: LogType,
    },
    Counter {
        name: String,
        delta: u64,
        total: u64,
    },
    Gauge {
        metrics: HashMap<String, GaugeValue>,
    },
    Timer {
        name: String,
        start: i64,
        stop: i64,
    },
    Event {
        title: String,
        body: String,
    },
}

impl Payload {
    pub fn envelope_type(&self) -> EnvelopeType {
        match self {
            Payload::Log { .. } => EnvelopeType::Log,
            Payload::Counter { .. } => EnvelopeType::Counter,
            Payload::Gauge { .. } => EnvelopeType::Gauge,
            Payload::Timer { .. } => EnvelopeType::Timer,
            Payload::Event { .. } => EnvelopeType::Event,
        }
    }
}

/// Filter tag for envelope payload kinds
///
/// The string forms match the store's `envelope_types` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EnvelopeType {
    Log,
    Counter,
    Gauge,
    Timer,
    Event,
}

impl EnvelopeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvelopeType::Log => "LOG",
            EnvelopeType::Counter => "COUNTER",
            EnvelopeType::Gauge => "GAUGE",
            EnvelopeType::Timer => "TIMER",
            EnvelopeType::Event => "EVENT",
        }
    }
}

impl fmt::Display for EnvelopeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnvelopeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LOG" => Ok(EnvelopeType::Log),
            "COUNTER" => Ok(EnvelopeType::Counter),
            "GAUGE" => Ok(EnvelopeType::Gauge),
            "TIMER" => Ok(EnvelopeType::Timer),
            "EVENT" => Ok(EnvelopeType::Event),
            other => Err(format!("unknown envelope type: {}", other)),
        }
    }
}

/// Ordered batch of envelopes returned by one read
pub type Page = Vec<Envelope>;
