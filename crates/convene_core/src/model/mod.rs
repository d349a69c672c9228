//! Persisted entity model for provisioned clients and their spaces.
//!
//! # Responsibility
//! - Define the records the blueprint engine finds, creates and updates.
//! - Name every entity kind so errors and change reports can point at it.
//!
//! # Invariants
//! - Every record carries a storage identifier (`uuid`) distinct from its
//!   natural key.
//! - Records are never deleted by the engine.

pub mod person;
pub mod room;
pub mod slug;
pub mod space;
pub mod utility;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Opaque key/value settings or configuration attached to furniture and
/// utility hookups.
///
/// Values are arbitrary JSON; only the kind registry gives keys meaning.
pub type FieldMap = BTreeMap<String, serde_json::Value>;

/// Every entity kind the engine provisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Client,
    Space,
    Room,
    FurniturePlacement,
    UtilityHookup,
    Person,
    Membership,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Space => "space",
            Self::Room => "room",
            Self::FurniturePlacement => "furniture_placement",
            Self::UtilityHookup => "utility_hookup",
            Self::Person => "person",
            Self::Membership => "membership",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds a `FieldMap` from a JSON object; any other JSON value yields an
/// empty map.
pub fn field_map(value: serde_json::Value) -> FieldMap {
    match value {
        serde_json::Value::Object(map) => map.into_iter().collect(),
        _ => FieldMap::new(),
    }
}
