// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Shard group data model

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Set of source ids that the requesters of a group observe together
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SubGroup {
    pub source_ids: BTreeSet<String>,
}

impl SubGroup {
    pub fn new<I, S>(source_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            source_ids: source_ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, source_id: &str) -> bool {
        self.source_ids.contains(source_id)
    }

    pub fn overlaps(&self, other: &SubGroup) -> bool {
        !self.source_ids.is_disjoint(&other.source_ids)
    }
}

/// Server view of a named group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShardGroup {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sub_groups: Vec<SubGroup>,
    #[serde(default)]
    pub requester_ids: BTreeSet<u64>,
}

impl ShardGroup {
    /// Union of every subgroup's source ids
    pub fn source_ids(&self) -> BTreeSet<String> {
        self.sub_groups
            .iter()
            .flat_map(|sg| sg.source_ids.iter().cloned())
            .collect()
    }

    /// True when no source id appears in more than one subgroup
    pub fn is_partition(&self) -> bool {
        let total: usize = self.sub_groups.iter().map(|sg| sg.source_ids.len()).sum();
        total == self.source_ids().len()
    }
}

/// One requester's claim that it reads `source_ids` under `group_name`
///
/// Ephemeral: the server drops it unless it is re-declared within its TTL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MembershipDeclaration {
    pub group_name: String,
    pub source_ids: BTreeSet<String>,
    pub requester_id: u64,
}

impl MembershipDeclaration {
    pub fn new<I, S>(group_name: impl Into<String>, source_ids: I, requester_id: u64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            group_name: group_name.into(),
            source_ids: source_ids.into_iter().map(Into::into).collect(),
            requester_id,
        }
    }

    /// Declaration covering a single source id
    pub fn single(group_name: impl Into<String>, source_id: impl Into<String>, requester_id: u64) -> Self {
        Self::new(group_name, [source_id.into()], requester_id)
    }
}
