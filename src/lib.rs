// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod cli;
pub mod client;
pub mod config;
pub mod emitter;
pub mod envelope;
pub mod group;
pub mod utils;
pub mod walk;

// Re-export main types
pub use client::{GroupReader, LogCacheClient, QueryResult, SourceMeta};
pub use config::{Config, ConfigError};
pub use emitter::{EmitError, LogEmitter};
pub use envelope::{Envelope, EnvelopeType, Page, TimeRange};
pub use group::{
    create_group, maintain_group, GroupError, GroupMaintainer, MemoryShardGroups,
    MembershipDeclareError, ShardGroup, ShardGroupClient, SubGroup,
};
pub use walk::{
    count_envelopes, walk, BackoffPolicy, CountReport, PageReader, ReadError, RetryBackoff,
    WalkError, WalkOptions, WalkSummary, Walker,
};
