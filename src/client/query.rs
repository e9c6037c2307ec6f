// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! PromQL results as returned by the gateway
//!
//! Queries are forwarded verbatim; nothing is evaluated client-side.

use serde_json::Value;
use std::collections::BTreeMap;

use super::wire::QueryData;

/// One sample: seconds since the epoch and the value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub time: f64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub metric: BTreeMap<String, String>,
    pub point: Point,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub metric: BTreeMap<String, String>,
    pub points: Vec<Point>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    Vector(Vec<Sample>),
    Matrix(Vec<Series>),
    Scalar(Point),
}

impl QueryResult {
    pub(crate) fn from_data(data: QueryData) -> Result<Self, String> {
        match data.result_type.as_str() {
            "vector" => {
                let items = as_array(&data.result)?;
                let samples = items
                    .iter()
                    .map(|item| {
                        Ok(Sample {
                            metric: parse_metric(item.get("metric"))?,
                            point: parse_point(
                                item.get("value").ok_or("vector sample missing value")?,
                            )?,
                        })
                    })
                    .collect::<Result<Vec<_>, String>>()?;
                Ok(QueryResult::Vector(samples))
            }
            "matrix" => {
                let items = as_array(&data.result)?;
                let series = items
                    .iter()
                    .map(|item| {
                        let values = item.get("values").ok_or("matrix series missing values")?;
                        Ok(Series {
                            metric: parse_metric(item.get("metric"))?,
                            points: as_array(values)?
                                .iter()
                                .map(parse_point)
                                .collect::<Result<Vec<_>, String>>()?,
                        })
                    })
                    .collect::<Result<Vec<_>, String>>()?;
                Ok(QueryResult::Matrix(series))
            }
            "scalar" => Ok(QueryResult::Scalar(parse_point(&data.result)?)),
            other => Err(format!("unsupported result type: {}", other)),
        }
    }
}

fn as_array(value: &Value) -> Result<&Vec<Value>, String> {
    value
        .as_array()
        .ok_or_else(|| format!("expected an array, got {}", value))
}

fn parse_metric(value: Option<&Value>) -> Result<BTreeMap<String, String>, String> {
    match value {
        None | Some(Value::Null) => Ok(BTreeMap::new()),
        Some(Value::Object(map)) => Ok(map
            .iter()
            .map(|(k, v)| {
                let v = v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string());
                (k.clone(), v)
            })
            .collect()),
        Some(other) => Err(format!("expected a label map, got {}", other)),
    }
}

/// `[<unix seconds>, "<value>"]`
fn parse_point(value: &Value) -> Result<Point, String> {
    let pair = as_array(value)?;
    if pair.len() != 2 {
        return Err(format!("expected [time, value], got {}", value));
    }

    let time = match &pair[0] {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
    .ok_or_else(|| format!("invalid sample time: {}", pair[0]))?;

    let value = match &pair[1] {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
    .ok_or_else(|| format!("invalid sample value: {}", pair[1]))?;

    Ok(Point { time, value })
}
