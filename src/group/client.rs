// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Shard group client trait definition

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::error::{GroupError, MembershipDeclareError};
use super::types::{MembershipDeclaration, ShardGroup};

/// Declares memberships in, and describes, server-managed shard groups
#[async_trait]
pub trait ShardGroupClient: Send + Sync {
    /// Declare that `requester_id` reads `source_ids` under `group_name`
    ///
    /// Idempotent: repeating an identical declaration only refreshes its TTL
    /// and must not fail because the membership already exists.
    async fn declare(
        &self,
        group_name: &str,
        source_ids: &[String],
        requester_id: u64,
    ) -> Result<(), GroupError>;

    /// Current server view of `group_name`
    async fn describe(&self, group_name: &str) -> Result<ShardGroup, GroupError>;

    async fn declare_membership(
        &self,
        declaration: &MembershipDeclaration,
    ) -> Result<(), GroupError> {
        let source_ids: Vec<String> = declaration.source_ids.iter().cloned().collect();
        self.declare(&declaration.group_name, &source_ids, declaration.requester_id)
            .await
    }
}

#[async_trait]
impl<T: ShardGroupClient + ?Sized> ShardGroupClient for Arc<T> {
    async fn declare(
        &self,
        group_name: &str,
        source_ids: &[String],
        requester_id: u64,
    ) -> Result<(), GroupError> {
        (**self).declare(group_name, source_ids, requester_id).await
    }

    async fn describe(&self, group_name: &str) -> Result<ShardGroup, GroupError> {
        (**self).describe(group_name).await
    }
}

/// Declare every entry once, failing on the first error
///
/// Each entry becomes its own subgroup unless the server merges overlapping
/// declarations.
pub async fn create_group<C>(
    client: &C,
    group_name: &str,
    entries: &[Vec<String>],
    requester_id: u64,
) -> Result<(), MembershipDeclareError>
where
    C: ShardGroupClient + ?Sized,
{
    for source_ids in entries {
        client
            .declare(group_name, source_ids, requester_id)
            .await
            .map_err(|source| MembershipDeclareError {
                group: group_name.to_string(),
                source_ids: source_ids.clone(),
                requester_id,
                source,
            })?;
        debug!(group = %group_name, ?source_ids, requester_id, "Declared membership");
    }
    Ok(())
}
