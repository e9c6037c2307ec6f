// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod emit;
pub mod group;
pub mod read;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::envelope::range::{now_nanos, to_nanos};
use crate::utils::duration::parse_duration;

/// Log cache walk CLI
#[derive(Parser, Debug)]
#[command(name = "logcache-walk")]
#[command(version)]
#[command(about = "Read, count and group log-cache envelopes", long_about = None)]
pub struct Cli {
    /// TOML config file; settings come from the environment when omitted
    #[arg(long, global = true, env = "LOGCACHE_WALK_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print every envelope for a source in a time range
    Walk(read::WalkArgs),

    /// Walk a source until enough matching envelopes are seen
    Count(read::CountArgs),

    /// Show retention statistics for every source
    Meta,

    /// Run a PromQL query through the gateway
    Query(read::QueryArgs),

    /// Ask the log emitter to write test traffic
    EmitLogs(emit::EmitArgs),

    /// Show the current layout of a shard group
    DescribeGroup(group::DescribeArgs),

    /// Keep memberships in a shard group alive until interrupted
    MaintainGroup(group::MaintainArgs),
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Walk(args) => read::walk_source(&config, args).await,
        Commands::Count(args) => read::count_source(&config, args).await,
        Commands::Meta => read::show_meta(&config).await,
        Commands::Query(args) => read::run_query(&config, args).await,
        Commands::EmitLogs(args) => emit::emit(&config, args).await,
        Commands::DescribeGroup(args) => group::describe(&config, args).await,
        Commands::MaintainGroup(args) => group::maintain(&config, args).await,
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => {
            Config::load(path).with_context(|| format!("loading {}", path.display()))
        }
        None => Config::from_env().context("loading configuration from environment"),
    }
}

/// Parse a time argument into unix nanoseconds
///
/// Accepts RFC 3339 (`2024-01-01T00:00:00Z`), raw nanoseconds, or a duration
/// meaning that long ago (`15m`).
pub fn parse_time(input: &str) -> Result<i64, String> {
    let input = input.trim();
    if let Ok(nanos) = input.parse::<i64>() {
        return Ok(nanos);
    }
    if let Ok(time) = DateTime::parse_from_rfc3339(input) {
        return Ok(to_nanos(time.with_timezone(&Utc)));
    }
    let ago = parse_duration(input)
        .map_err(|_| format!("expected RFC 3339, nanoseconds or a duration: {}", input))?;
    let ago = i64::try_from(ago.as_nanos()).map_err(|_| format!("duration too large: {}", input))?;
    Ok(now_nanos().saturating_sub(ago))
}

/// Token cancelled on Ctrl-C
pub(crate) fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            child.cancel();
        }
    });
    token
}

pub(crate) fn require_sources(source_ids: &[String]) -> Result<()> {
    if source_ids.is_empty() {
        return Err(anyhow!("At least one --source-id is required"));
    }
    Ok(())
}
