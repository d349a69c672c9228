//! Per-pass change accounting.

use crate::model::EntityKind;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Entities created and updated during one reconciliation pass.
///
/// A pass over an already-converged blueprint yields an empty change set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    created: BTreeMap<EntityKind, u32>,
    updated: BTreeMap<EntityKind, u32>,
}

impl ChangeSet {
    pub(crate) fn record_created(&mut self, kind: EntityKind) {
        *self.created.entry(kind).or_default() += 1;
    }

    pub(crate) fn record_updated(&mut self, kind: EntityKind) {
        *self.updated.entry(kind).or_default() += 1;
    }

    pub fn created(&self, kind: EntityKind) -> u32 {
        self.created.get(&kind).copied().unwrap_or(0)
    }

    pub fn updated(&self, kind: EntityKind) -> u32 {
        self.updated.get(&kind).copied().unwrap_or(0)
    }

    pub fn total_created(&self) -> u32 {
        self.created.values().sum()
    }

    pub fn total_updated(&self) -> u32 {
        self.updated.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty()
    }
}

impl Display for ChangeSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let render = |counts: &BTreeMap<EntityKind, u32>| {
            counts
                .iter()
                .map(|(kind, count)| format!("{kind}:{count}"))
                .collect::<Vec<_>>()
                .join(",")
        };
        write!(
            f,
            "created=[{}] updated=[{}]",
            render(&self.created),
            render(&self.updated)
        )
    }
}
