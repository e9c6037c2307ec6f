// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! In-process shard group membership table
//!
//! Mirrors the server contract closely enough to exercise maintainers and
//! consumers without a running store: declarations expire after a TTL unless
//! refreshed, and overlapping declarations are merged into one subgroup so
//! subgroups never share a source id.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use super::client::ShardGroupClient;
use super::error::GroupError;
use super::types::{ShardGroup, SubGroup};

/// Default lifetime of an unrefreshed declaration
pub const DEFAULT_MEMBERSHIP_TTL: Duration = Duration::from_secs(30);

type DeclarationKey = (BTreeSet<String>, u64);

/// Membership table with TTL expiry
pub struct MemoryShardGroups {
    ttl: Duration,
    groups: Mutex<HashMap<String, HashMap<DeclarationKey, Instant>>>,
}

impl MemoryShardGroups {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_MEMBERSHIP_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            groups: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Live declarations for `group_name`
    pub fn declaration_count(&self, group_name: &str) -> usize {
        let mut groups = self.groups.lock().unwrap_or_else(|e| e.into_inner());
        Self::prune(&mut groups, group_name, Instant::now());
        groups.get(group_name).map(|d| d.len()).unwrap_or(0)
    }

    fn prune(
        groups: &mut HashMap<String, HashMap<DeclarationKey, Instant>>,
        group_name: &str,
        now: Instant,
    ) {
        if let Some(declarations) = groups.get_mut(group_name) {
            declarations.retain(|_, expires_at| *expires_at > now);
            if declarations.is_empty() {
                groups.remove(group_name);
            }
        }
    }
}

impl Default for MemoryShardGroups {
    fn default() -> Self {
        Self::new()
    }
}

/// Merge source sets that share any id into connected components
fn partition<'a>(sets: impl Iterator<Item = &'a BTreeSet<String>>) -> Vec<SubGroup> {
    let mut components: Vec<BTreeSet<String>> = Vec::new();

    for set in sets {
        let mut merged = set.clone();
        components.retain(|component| {
            if component.is_disjoint(&merged) {
                true
            } else {
                merged.extend(component.iter().cloned());
                false
            }
        });
        components.push(merged);
    }

    components.sort();
    components
        .into_iter()
        .map(|source_ids| SubGroup { source_ids })
        .collect()
}

#[async_trait]
impl ShardGroupClient for MemoryShardGroups {
    async fn declare(
        &self,
        group_name: &str,
        source_ids: &[String],
        requester_id: u64,
    ) -> Result<(), GroupError> {
        if group_name.is_empty() {
            return Err(GroupError::InvalidRequest("group name is empty".to_string()));
        }
        let ids: BTreeSet<String> = source_ids.iter().filter(|s| !s.is_empty()).cloned().collect();
        if ids.is_empty() {
            return Err(GroupError::InvalidRequest(
                "declaration has no source ids".to_string(),
            ));
        }

        let now = Instant::now();
        let mut groups = self.groups.lock().unwrap_or_else(|e| e.into_inner());
        Self::prune(&mut groups, group_name, now);
        groups
            .entry(group_name.to_string())
            .or_default()
            .insert((ids, requester_id), now + self.ttl);
        Ok(())
    }

    async fn describe(&self, group_name: &str) -> Result<ShardGroup, GroupError> {
        let mut groups = self.groups.lock().unwrap_or_else(|e| e.into_inner());
        Self::prune(&mut groups, group_name, Instant::now());

        let declarations = groups
            .get(group_name)
            .ok_or_else(|| GroupError::NotFound(group_name.to_string()))?;

        // Deterministic merge order regardless of HashMap iteration
        let mut keys: Vec<&DeclarationKey> = declarations.keys().collect();
        keys.sort();

        Ok(ShardGroup {
            name: group_name.to_string(),
            sub_groups: partition(keys.iter().map(|(ids, _)| ids)),
            requester_ids: keys.iter().map(|(_, requester)| *requester).collect(),
        })
    }
}
