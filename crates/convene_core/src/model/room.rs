//! Rooms and the furniture placed in them.
//!
//! # Invariants
//! - `Room.name` and `Room.slug` are unique within one space.
//! - A furniture placement is addressed by `(room_uuid, slot)`; the slot is a
//!   positional index into the room's furniture list, not a stable identity.

use crate::model::space::SpaceId;
use crate::model::FieldMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type RoomId = Uuid;
pub type FurniturePlacementId = Uuid;

/// Whether entering a room requires an access code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    Locked,
    #[default]
    Unlocked,
}

impl AccessLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Locked => "locked",
            Self::Unlocked => "unlocked",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "locked" => Some(Self::Locked),
            "unlocked" => Some(Self::Unlocked),
            _ => None,
        }
    }
}

/// Whether a room shows up in the space's room listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicityLevel {
    Listed,
    Unlisted,
}

impl PublicityLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Listed => "listed",
            Self::Unlisted => "unlisted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "listed" => Some(Self::Listed),
            "unlisted" => Some(Self::Unlisted),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub uuid: RoomId,
    pub space_uuid: SpaceId,
    pub name: String,
    pub slug: String,
    pub access_level: AccessLevel,
    pub publicity_level: Option<PublicityLevel>,
    pub access_code: Option<String>,
}

impl Room {
    /// Builds an unsaved room with storage defaults for every non-key field.
    pub fn new(space_uuid: SpaceId, name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            space_uuid,
            name: name.into(),
            slug: slug.into(),
            access_level: AccessLevel::default(),
            publicity_level: None,
            access_code: None,
        }
    }
}

/// One piece of furniture at a positional slot inside a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FurniturePlacement {
    pub uuid: FurniturePlacementId,
    pub room_uuid: RoomId,
    pub slot: u32,
    /// Furniture kind tag, resolved through the kind registry.
    pub furniture_kind: String,
    /// Runtime-owned once set; see `blueprint::policy`.
    pub settings: FieldMap,
}

impl FurniturePlacement {
    pub fn new(room_uuid: RoomId, slot: u32, furniture_kind: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            room_uuid,
            slot,
            furniture_kind: furniture_kind.into(),
            settings: FieldMap::new(),
        }
    }
}
