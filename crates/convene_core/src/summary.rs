//! Serializable space summaries for operators.
//!
//! # Invariants
//! - Furniture settings are projected onto the fields their kind recognizes.
//! - Utility configuration is reduced to its key names; values may be
//!   credentials and never leave the store through a summary.
//! - Room access codes are omitted; only whether one is set is reported.

use crate::blueprint::{ChangeSet, Reconciliation, SpaceGraph};
use crate::model::room::{AccessLevel, PublicityLevel};
use crate::model::space::Theme;
use crate::model::utility::UtilityStatus;
use crate::model::FieldMap;
use crate::registry::{KindFamily, KindRegistry};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpaceSummary {
    pub uuid: String,
    pub name: String,
    pub slug: String,
    pub branded_domain: Option<String>,
    pub theme: Option<Theme>,
    /// Entrance room name.
    pub entrance: Option<String>,
    pub rooms: Vec<RoomSummary>,
    pub utility_hookups: Vec<UtilityHookupSummary>,
    pub members: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changes: Option<ChangeSet>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomSummary {
    pub name: String,
    pub slug: String,
    pub access_level: AccessLevel,
    pub publicity_level: Option<PublicityLevel>,
    pub has_access_code: bool,
    pub furniture: Vec<FurnitureSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FurnitureSummary {
    pub slot: u32,
    pub kind: String,
    pub settings: FieldMap,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UtilityHookupSummary {
    pub name: String,
    pub kind: String,
    pub status: UtilityStatus,
    pub configured_keys: Vec<String>,
}

impl SpaceSummary {
    pub fn from_graph(graph: &SpaceGraph, registry: &KindRegistry) -> Self {
        let rooms = graph
            .rooms
            .iter()
            .map(|entry| RoomSummary {
                name: entry.room.name.clone(),
                slug: entry.room.slug.clone(),
                access_level: entry.room.access_level,
                publicity_level: entry.room.publicity_level,
                has_access_code: entry
                    .room
                    .access_code
                    .as_deref()
                    .is_some_and(|code| !code.trim().is_empty()),
                furniture: entry
                    .furniture
                    .iter()
                    .map(|placement| FurnitureSummary {
                        slot: placement.slot,
                        kind: placement.furniture_kind.clone(),
                        settings: registry.project(
                            KindFamily::Furniture,
                            &placement.furniture_kind,
                            &placement.settings,
                        ),
                    })
                    .collect(),
            })
            .collect();

        let utility_hookups = graph
            .utility_hookups
            .iter()
            .map(|hookup| UtilityHookupSummary {
                name: hookup.name.clone(),
                kind: hookup.utility_kind.clone(),
                status: hookup.status,
                configured_keys: hookup.configuration.keys().cloned().collect(),
            })
            .collect();

        Self {
            uuid: graph.space.uuid.to_string(),
            name: graph.space.name.clone(),
            slug: graph.space.slug.clone(),
            branded_domain: graph.space.branded_domain.clone(),
            theme: graph.space.theme,
            entrance: graph.entrance().map(|entry| entry.room.name.clone()),
            rooms,
            utility_hookups,
            members: graph
                .members
                .iter()
                .map(|member| member.person.email.clone())
                .collect(),
            changes: None,
        }
    }

    /// Summary of a pass result, including its change counts.
    pub fn from_reconciliation(reconciliation: &Reconciliation, registry: &KindRegistry) -> Self {
        Self {
            changes: Some(reconciliation.changes.clone()),
            ..Self::from_graph(&reconciliation.space, registry)
        }
    }
}
