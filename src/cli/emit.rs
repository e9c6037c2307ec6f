// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Args;
use uuid::Uuid;

use super::shutdown_token;
use crate::config::Config;
use crate::emitter::LogEmitter;

/// Arguments for emit-logs command
#[derive(Args, Debug)]
pub struct EmitArgs {
    /// Source ids to emit for (repeatable); a fresh id is generated when omitted
    #[arg(long = "source-id")]
    pub source_ids: Vec<String>,

    /// Emit gauges instead of logs
    #[arg(long)]
    pub gauges: bool,

    /// Return without waiting for the envelopes to propagate
    #[arg(long)]
    pub no_wait: bool,
}

pub async fn emit(config: &Config, args: EmitArgs) -> Result<()> {
    let emitter = LogEmitter::from_config(config)?;

    let source_ids = if args.source_ids.is_empty() {
        vec![Uuid::new_v4().to_string()]
    } else {
        args.source_ids
    };

    if args.gauges {
        emitter.emit_gauges(&source_ids).await?;
    } else {
        emitter.emit_logs(&source_ids).await?;
    }

    for source_id in &source_ids {
        println!("{}", source_id);
    }

    if !args.no_wait {
        emitter.wait_for_propagation(&shutdown_token()).await?;
    }
    Ok(())
}
