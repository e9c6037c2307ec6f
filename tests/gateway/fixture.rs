// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// In-process stand-in for the log-cache gateway, UAA and the log emitter

use axum::extract::{Path, Query, RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use logcache_walk::group::{MemoryShardGroups, ShardGroupClient};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

pub const TOKEN: &str = "fixture-token";

#[derive(Default)]
pub struct Recorded {
    pub reads: Vec<Vec<(String, String)>>,
    pub emits: Vec<String>,
    pub token_requests: usize,
    pub unauthorized: usize,
}

#[derive(Clone)]
pub struct Gateway {
    /// source id -> timestamps of stored log lines
    store: Arc<HashMap<String, Vec<i64>>>,
    groups: Arc<MemoryShardGroups>,
    pub recorded: Arc<Mutex<Recorded>>,
    require_auth: bool,
    fail_reads: Arc<Mutex<usize>>,
}

impl Gateway {
    pub fn new(sources: &[(&str, i64)]) -> Self {
        let store = sources
            .iter()
            .map(|(id, count)| (id.to_string(), (1..=*count).collect()))
            .collect();
        Self {
            store: Arc::new(store),
            groups: Arc::new(MemoryShardGroups::new()),
            recorded: Arc::new(Mutex::new(Recorded::default())),
            require_auth: false,
            fail_reads: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_auth(mut self) -> Self {
        self.require_auth = true;
        self
    }

    /// Next `n` reads answer 503
    pub fn fail_next_reads(&self, n: usize) {
        *self.fail_reads.lock().unwrap() = n;
    }

    pub async fn serve(self) -> SocketAddr {
        let app = Router::new()
            .route("/api/v1/read/:source_id", get(read_source))
            .route("/api/v1/meta", get(meta))
            .route("/api/v1/query", get(query))
            .route("/api/v1/query_range", get(query_range))
            .route("/api/v1/shard_group/:name", get(read_group).put(set_group))
            .route("/api/v1/shard_group/:name/meta", get(group_meta))
            .route("/emit-logs", get(emit))
            .route("/emit-gauges", get(emit))
            .route("/oauth/token", post(token))
            .with_state(self);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        if !self.require_auth {
            return true;
        }
        let ok = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == format!("bearer {}", TOKEN))
            .unwrap_or(false);
        if !ok {
            self.recorded.lock().unwrap().unauthorized += 1;
        }
        ok
    }

    fn page(&self, sources: &[String], params: &[(String, String)]) -> Value {
        let param = |key: &str| {
            params
                .iter()
                .find(|(k, _)| k == key)
                .and_then(|(_, v)| v.parse::<i64>().ok())
        };
        let start = param("start_time").unwrap_or(0);
        let end = param("end_time").unwrap_or(i64::MAX);
        let limit = param("limit").unwrap_or(10) as usize;

        let mut envelopes: Vec<(i64, &String)> = sources
            .iter()
            .filter_map(|id| self.store.get(id).map(|ts| (id, ts)))
            .flat_map(|(id, ts)| ts.iter().map(move |t| (*t, id)))
            .filter(|(t, _)| *t >= start && *t < end)
            .collect();
        envelopes.sort();
        envelopes.truncate(limit);

        let batch: Vec<Value> = envelopes
            .into_iter()
            .map(|(ts, id)| {
                json!({
                    "timestamp": ts.to_string(),
                    "sourceId": id,
                    "instanceId": "0",
                    "log": {
                        "payload": BASE64.encode(format!("log line {}", ts)),
                        "type": "OUT"
                    }
                })
            })
            .collect();
        json!({ "envelopes": { "batch": batch } })
    }

    fn take_failure(&self) -> bool {
        let mut remaining = self.fail_reads.lock().unwrap();
        if *remaining > 0 {
            *remaining -= 1;
            true
        } else {
            false
        }
    }
}

async fn read_source(
    State(gw): State<Gateway>,
    Path(source_id): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Response {
    if !gw.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    gw.recorded.lock().unwrap().reads.push(params.clone());
    if gw.take_failure() {
        return (StatusCode::SERVICE_UNAVAILABLE, "try again").into_response();
    }
    Json(gw.page(&[source_id], &params)).into_response()
}

async fn meta(State(gw): State<Gateway>) -> Json<Value> {
    let meta: serde_json::Map<String, Value> = gw
        .store
        .iter()
        .map(|(id, ts)| {
            (
                id.clone(),
                json!({
                    "count": ts.len().to_string(),
                    "expired": "0",
                    "oldestTimestamp": ts.first().copied().unwrap_or(0).to_string(),
                    "newestTimestamp": ts.last().copied().unwrap_or(0).to_string(),
                }),
            )
        })
        .collect();
    Json(json!({ "meta": meta }))
}

async fn query(Query(params): Query<HashMap<String, String>>) -> Response {
    match params.get("query").map(String::as_str) {
        Some("bad(") => (
            StatusCode::OK,
            Json(json!({"status": "error", "error": "parse error"})),
        )
            .into_response(),
        Some(_) => Json(json!({
            "status": "success",
            "data": {
                "resultType": "vector",
                "result": [{"metric": {"source_id": "app-1"}, "value": [1700000000, "25"]}]
            }
        }))
        .into_response(),
        None => StatusCode::BAD_REQUEST.into_response(),
    }
}

async fn query_range(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let step = params.get("step").cloned().unwrap_or_default();
    Json(json!({
        "status": "success",
        "data": {
            "resultType": "matrix",
            "result": [{"metric": {"step": step}, "values": [[1, "1"], [2, "2"], [3, "3"]]}]
        }
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetGroupBody {
    source_ids: Vec<String>,
    requester_id: u64,
}

async fn set_group(
    State(gw): State<Gateway>,
    Path(name): Path<String>,
    Json(body): Json<SetGroupBody>,
) -> Response {
    match gw.groups.declare(&name, &body.source_ids, body.requester_id).await {
        Ok(()) => Json(json!({})).into_response(),
        Err(e) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    }
}

async fn group_meta(State(gw): State<Gateway>, Path(name): Path<String>) -> Response {
    match gw.groups.describe(&name).await {
        Ok(group) => Json(json!({
            "subGroups": group
                .sub_groups
                .iter()
                .map(|sg| json!({"sourceIds": sg.source_ids}))
                .collect::<Vec<_>>(),
            "requesterIds": group
                .requester_ids
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>(),
        }))
        .into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "unknown group").into_response(),
    }
}

async fn read_group(
    State(gw): State<Gateway>,
    Path(name): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    if !params.iter().any(|(k, _)| k == "requester_id") {
        return (StatusCode::BAD_REQUEST, "requester_id required").into_response();
    }
    match gw.groups.describe(&name).await {
        Ok(group) => {
            let sources: Vec<String> = group.source_ids().into_iter().collect();
            Json(gw.page(&sources, &params)).into_response()
        }
        Err(_) => (StatusCode::NOT_FOUND, "unknown group").into_response(),
    }
}

async fn emit(State(gw): State<Gateway>, RawQuery(query): RawQuery) -> StatusCode {
    let query = query.unwrap_or_default();
    if query.is_empty() {
        return StatusCode::BAD_REQUEST;
    }
    gw.recorded.lock().unwrap().emits.push(query);
    StatusCode::OK
}

async fn token(State(gw): State<Gateway>, headers: HeaderMap, body: String) -> Response {
    let basic = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let expected = format!("Basic {}", BASE64.encode("walker:secret"));
    if basic != expected || !body.contains("grant_type=client_credentials") {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    gw.recorded.lock().unwrap().token_requests += 1;
    Json(json!({
        "access_token": TOKEN,
        "token_type": "bearer",
        "expires_in": 3600
    }))
    .into_response()
}
