// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use clap::Args;
use std::time::Duration;
use tracing::info;

use super::{parse_time, shutdown_token};
use crate::client::{LogCacheClient, QueryResult};
use crate::config::Config;
use crate::envelope::range::now_nanos;
use crate::envelope::{Envelope, EnvelopeType, TimeRange};
use crate::utils::duration::parse_duration;
use crate::walk::{count_envelopes, log_contains, walk, RetryBackoff, WalkOptions};

/// Arguments for walk command
#[derive(Args, Debug)]
pub struct WalkArgs {
    /// Source id to read
    #[arg(long)]
    pub source_id: String,

    /// Range start: RFC 3339, nanoseconds, or a duration ago
    #[arg(long, value_parser = parse_time, default_value = "1h")]
    pub start: i64,

    /// Range end; defaults to now
    #[arg(long, value_parser = parse_time)]
    pub end: Option<i64>,

    /// Only these envelope types (repeatable)
    #[arg(long = "envelope-type", value_parser = parse_envelope_type)]
    pub envelope_types: Vec<EnvelopeType>,

    /// Attempts per cursor position before giving up
    #[arg(long, default_value_t = 100)]
    pub max_attempts: u32,

    /// Delay between attempts
    #[arg(long, value_parser = parse_duration, default_value = "50ms")]
    pub delay: Duration,

    /// Page size requested from the store
    #[arg(long)]
    pub limit: Option<usize>,
}

/// Arguments for count command
#[derive(Args, Debug)]
pub struct CountArgs {
    #[arg(long)]
    pub source_id: String,

    /// Stop once this many matching envelopes are seen
    #[arg(long)]
    pub target: usize,

    /// Only count log envelopes containing this text
    #[arg(long)]
    pub contains: Option<String>,

    #[arg(long, value_parser = parse_time, default_value = "1h")]
    pub start: i64,

    #[arg(long, value_parser = parse_time)]
    pub end: Option<i64>,

    #[arg(long, default_value_t = 100)]
    pub max_attempts: u32,

    #[arg(long, value_parser = parse_duration, default_value = "50ms")]
    pub delay: Duration,
}

/// Arguments for query command
#[derive(Args, Debug)]
pub struct QueryArgs {
    /// PromQL expression
    pub promql: String,

    /// Run a range query from this time
    #[arg(long, value_parser = parse_time, requires = "step")]
    pub start: Option<i64>,

    #[arg(long, value_parser = parse_time)]
    pub end: Option<i64>,

    /// Range query resolution
    #[arg(long, value_parser = parse_duration)]
    pub step: Option<Duration>,
}

fn parse_envelope_type(input: &str) -> Result<EnvelopeType, String> {
    input.parse()
}

fn walk_options(config: &Config, max_attempts: u32, delay: Duration) -> WalkOptions {
    WalkOptions::new()
        .with_backoff(RetryBackoff::new(delay, max_attempts))
        .with_read_timeout(config.default_timeout)
}

fn print_envelope(envelope: &Envelope) {
    let text = envelope.log_text().unwrap_or_default();
    println!(
        "{} {} {} {}",
        envelope.timestamp,
        envelope.source_id,
        envelope.envelope_type(),
        text.trim_end()
    );
}

/// Print every envelope in range
pub async fn walk_source(config: &Config, args: WalkArgs) -> Result<()> {
    let client = LogCacheClient::from_config(config)?;
    let range = TimeRange::new(args.start, args.end.unwrap_or_else(now_nanos));
    let mut options = walk_options(config, args.max_attempts, args.delay)
        .with_envelope_types(args.envelope_types);
    if let Some(limit) = args.limit {
        options = options.with_limit(limit);
    }

    let token = shutdown_token();
    let summary = walk(&token, &args.source_id, range, client, options, |page| {
        page.iter().for_each(print_envelope);
        true
    })
    .await?;

    info!(
        subject = %summary.subject,
        delivered = summary.delivered,
        pages = summary.pages,
        "Walk complete"
    );
    Ok(())
}

/// Count envelopes until the target is reached
pub async fn count_source(config: &Config, args: CountArgs) -> Result<()> {
    let client = LogCacheClient::from_config(config)?;
    let range = TimeRange::new(args.start, args.end.unwrap_or_else(now_nanos));
    let options = walk_options(config, args.max_attempts, args.delay);
    let token = shutdown_token();

    let report = count_envelopes(
        &token,
        client,
        &args.source_id,
        range,
        options,
        args.target,
        args.contains.map(log_contains),
    )
    .await;

    let matched = report.count();
    println!("received: {}", report.tally.received);
    println!("matched:  {}", matched);

    match report.outcome {
        Ok(_) if matched >= args.target => Ok(()),
        Ok(_) => Err(anyhow!(
            "range exhausted after {} of {} envelopes",
            matched,
            args.target
        )),
        Err(e) => Err(e.into()),
    }
}

/// Print per-source retention statistics
pub async fn show_meta(config: &Config) -> Result<()> {
    let client = LogCacheClient::from_config(config)?;
    let mut meta: Vec<_> = client.meta().await?.into_iter().collect();
    meta.sort_by(|a, b| a.0.cmp(&b.0));

    for (source_id, m) in meta {
        println!(
            "{}\tcount={}\texpired={}\toldest={}\tnewest={}",
            source_id, m.count, m.expired, m.oldest_timestamp, m.newest_timestamp
        );
    }
    Ok(())
}

/// Forward a PromQL query and print the result
pub async fn run_query(config: &Config, args: QueryArgs) -> Result<()> {
    let client = LogCacheClient::from_config(config)?;

    let result = match (args.start, args.step) {
        (Some(start), Some(step)) => {
            let end = args.end.unwrap_or_else(now_nanos);
            client
                .promql_range(&args.promql, nanos_to_secs(start), nanos_to_secs(end), step)
                .await?
        }
        _ => client.promql(&args.promql).await?,
    };

    match result {
        QueryResult::Scalar(point) => println!("{} @ {}", point.value, point.time),
        QueryResult::Vector(samples) => {
            for sample in samples {
                println!("{:?} {} @ {}", sample.metric, sample.point.value, sample.point.time);
            }
        }
        QueryResult::Matrix(series) => {
            for s in series {
                println!("{:?}", s.metric);
                for point in s.points {
                    println!("  {} @ {}", point.value, point.time);
                }
            }
        }
    }
    Ok(())
}

fn nanos_to_secs(nanos: i64) -> f64 {
    nanos as f64 / 1e9
}
