// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Reading through the HTTP gateway

use super::fixture::{Gateway, TOKEN};
use logcache_walk::client::{ClientError, LogCacheClient, QueryResult, StaticToken};
use logcache_walk::config::Config;
use logcache_walk::envelope::{EnvelopeType, TimeRange};
use logcache_walk::walk::{walk, ReadOptions, RetryBackoff, WalkEnd, WalkOptions};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn config_for(addr: std::net::SocketAddr) -> Config {
    Config {
        log_cache_addr: format!("http://{}", addr),
        log_emitter_addr: addr.to_string(),
        ..Config::default()
    }
}

#[tokio::test]
async fn test_read_decodes_page_and_sends_params() {
    let gateway = Gateway::new(&[("app-1", 25)]);
    let recorded = gateway.recorded.clone();
    let addr = gateway.serve().await;
    let client = LogCacheClient::new(&addr.to_string()).unwrap();

    let options = ReadOptions {
        envelope_types: vec![EnvelopeType::Log],
        limit: Some(5),
    };
    let page = client
        .read("app-1", TimeRange::new(3, 100), &options)
        .await
        .unwrap();

    assert_eq!(page.len(), 5);
    assert_eq!(page[0].timestamp, 3);
    assert_eq!(page[0].log_text().as_deref(), Some("log line 3"));

    let params = recorded.lock().unwrap().reads[0].clone();
    assert!(params.contains(&("start_time".to_string(), "3".to_string())));
    assert!(params.contains(&("end_time".to_string(), "100".to_string())));
    assert!(params.contains(&("limit".to_string(), "5".to_string())));
    assert!(params.contains(&("envelope_types".to_string(), "LOG".to_string())));
}

#[tokio::test]
async fn test_walk_over_http_drains_source_through_failures() {
    let gateway = Gateway::new(&[("app-1", 25)]);
    gateway.fail_next_reads(2);
    let recorded = gateway.recorded.clone();
    let addr = gateway.serve().await;
    let client = LogCacheClient::from_config(&config_for(addr)).unwrap();

    let token = CancellationToken::new();
    let options = WalkOptions::new()
        .with_backoff(RetryBackoff::new(Duration::from_millis(5), 5))
        .with_limit(10);

    let mut timestamps = Vec::new();
    let summary = walk(&token, "app-1", TimeRange::new(1, 26), client, options, |page| {
        timestamps.extend(page.iter().map(|e| e.timestamp));
        true
    })
    .await
    .unwrap();

    assert_eq!(timestamps, (1..=25).collect::<Vec<_>>());
    assert_eq!(summary.end, WalkEnd::RangeExhausted);
    // 2 failures + 3 pages
    assert_eq!(recorded.lock().unwrap().reads.len(), 5);
}

#[tokio::test]
async fn test_status_error_surfaces() {
    let gateway = Gateway::new(&[]).with_auth();
    let addr = gateway.serve().await;
    let client = LogCacheClient::new(&addr.to_string()).unwrap();

    let err = client
        .read("app-1", TimeRange::since(0), &ReadOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Status { code: 401, .. }));
}

#[tokio::test]
async fn test_static_token_sent() {
    let gateway = Gateway::new(&[("app-1", 3)]).with_auth();
    let recorded = gateway.recorded.clone();
    let addr = gateway.serve().await;
    let client = LogCacheClient::new(&addr.to_string())
        .unwrap()
        .with_token_source(Arc::new(StaticToken::new(format!("bearer {}", TOKEN))));

    let page = client
        .read("app-1", TimeRange::since(0), &ReadOptions::default())
        .await
        .unwrap();
    assert_eq!(page.len(), 3);
    assert_eq!(recorded.lock().unwrap().unauthorized, 0);
}

#[tokio::test]
async fn test_uaa_token_fetched_once_and_cached() {
    let gateway = Gateway::new(&[("app-1", 3)]).with_auth();
    let recorded = gateway.recorded.clone();
    let addr = gateway.serve().await;

    let config = Config {
        uaa_url: Some(format!("http://{}", addr)),
        client_id: Some("walker".to_string()),
        client_secret: Some("secret".to_string()),
        ..config_for(addr)
    };
    let client = LogCacheClient::from_config(&config).unwrap();

    for _ in 0..3 {
        client
            .read("app-1", TimeRange::since(0), &ReadOptions::default())
            .await
            .unwrap();
    }

    let recorded = recorded.lock().unwrap();
    assert_eq!(recorded.token_requests, 1);
    assert_eq!(recorded.unauthorized, 0);
}

#[tokio::test]
async fn test_meta_reports_every_source() {
    let addr = Gateway::new(&[("app-1", 25), ("app-2", 4)]).serve().await;
    let client = LogCacheClient::new(&addr.to_string()).unwrap();

    let meta = client.meta().await.unwrap();
    assert_eq!(meta.len(), 2);
    assert_eq!(meta["app-1"].count, 25);
    assert_eq!(meta["app-2"].newest_timestamp, 4);
}

#[tokio::test]
async fn test_promql_passthrough() {
    let addr = Gateway::new(&[]).serve().await;
    let client = LogCacheClient::new(&addr.to_string()).unwrap();

    match client.promql("sum(metric{source_id=\"app-1\"})").await.unwrap() {
        QueryResult::Vector(samples) => assert_eq!(samples[0].point.value, 25.0),
        other => panic!("Expected vector, got: {:?}", other),
    }

    let err = client.promql("bad(").await.unwrap_err();
    assert_eq!(err, ClientError::Query("parse error".to_string()));

    match client
        .promql_range("metric", 1.0, 3.0, Duration::from_secs(1))
        .await
        .unwrap()
    {
        QueryResult::Matrix(series) => {
            assert_eq!(series[0].points.len(), 3);
            assert_eq!(series[0].metric["step"], "1s");
        }
        other => panic!("Expected matrix, got: {:?}", other),
    }
}
