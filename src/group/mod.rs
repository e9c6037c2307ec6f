// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Shard group coordination
//!
//! Independent consumers declare which source ids they read under a group
//! name; the server partitions the declared ids into subgroups and expires
//! memberships that are not refreshed. This module holds the client-side
//! half: the client trait, an in-process membership table, and the
//! maintainer that keeps declarations alive.

pub mod client;
pub mod error;
pub mod maintainer;
pub mod memory;
pub mod types;

pub use client::{create_group, ShardGroupClient};
pub use error::{GroupError, MembershipDeclareError};
pub use maintainer::{
    maintain_group, GroupMaintainer, MaintainerHandle, MaintainerReport, MaintainerState,
    MaintainerStats, DEFAULT_DECLARE_TIMEOUT, DEFAULT_REFRESH_INTERVAL,
};
pub use memory::{MemoryShardGroups, DEFAULT_MEMBERSHIP_TTL};
pub use types::{MembershipDeclaration, ShardGroup, SubGroup};
