// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Args;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::require_sources;
use crate::client::LogCacheClient;
use crate::config::Config;
use crate::group::{GroupMaintainer, ShardGroupClient};

/// Arguments for describe-group command
#[derive(Args, Debug)]
pub struct DescribeArgs {
    #[arg(long)]
    pub group: String,
}

/// Arguments for maintain-group command
#[derive(Args, Debug)]
pub struct MaintainArgs {
    #[arg(long)]
    pub group: String,

    /// Source ids to keep declared (repeatable)
    #[arg(long = "source-id")]
    pub source_ids: Vec<String>,

    /// Requester id; a random one is chosen when omitted
    #[arg(long)]
    pub requester_id: Option<u64>,

    /// Declare all source ids as one membership instead of one per id
    #[arg(long)]
    pub together: bool,
}

pub async fn describe(config: &Config, args: DescribeArgs) -> Result<()> {
    let client = LogCacheClient::from_config(config)?;
    let group = client.describe(&args.group).await?;

    println!("group: {}", group.name);
    println!("requesters: {:?}", group.requester_ids);
    for (i, sub_group) in group.sub_groups.iter().enumerate() {
        println!("subgroup {}: {:?}", i, sub_group.source_ids);
    }
    Ok(())
}

pub async fn maintain(config: &Config, args: MaintainArgs) -> Result<()> {
    require_sources(&args.source_ids)?;

    let client: Arc<dyn ShardGroupClient> = Arc::new(LogCacheClient::from_config(config)?);
    let requester_id = args.requester_id.unwrap_or_else(rand::random);

    let maintainer = if args.together {
        GroupMaintainer::with_entries(&args.group, vec![args.source_ids], requester_id, client)
    } else {
        GroupMaintainer::new(&args.group, &args.source_ids, requester_id, client)
    };

    let (failures_tx, mut failures) = mpsc::unbounded_channel();
    let maintainer = maintainer
        .with_interval(config.group_refresh_interval)
        .with_declare_timeout(config.declare_timeout)
        .with_failure_sink(failures_tx);

    info!(group = %args.group, requester_id, "Maintaining shard group, Ctrl-C to stop");
    let handle = maintainer.spawn(CancellationToken::new());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            Some(failure) = failures.recv() => warn!("{}", failure),
        }
    }

    let report = handle.stop().await?;
    println!(
        "ticks: {}, declared: {}, failures: {}",
        report.ticks, report.declared, report.failures
    );
    Ok(())
}
