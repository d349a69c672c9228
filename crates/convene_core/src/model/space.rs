//! Client and space records.
//!
//! # Invariants
//! - `Client.name` and `Space.name` are globally unique natural keys.
//! - `Space.entrance_uuid`, when set, points at a room of the same space
//!   (enforced by a composite foreign key in storage).

use crate::model::room::RoomId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ClientId = Uuid;
pub type SpaceId = Uuid;

/// Organization that owns one or more spaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub uuid: ClientId,
    pub name: String,
    pub slug: String,
}

impl Client {
    /// Builds an unsaved client carrying only its natural key.
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            slug: slug.into(),
        }
    }
}

/// Visual theme options for a space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    PurpleMountains,
    DesertDunes,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PurpleMountains => "purple_mountains",
            Self::DesertDunes => "desert_dunes",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "purple_mountains" => Some(Self::PurpleMountains),
            "desert_dunes" => Some(Self::DesertDunes),
            _ => None,
        }
    }
}

/// Collaboration space owned by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
    pub uuid: SpaceId,
    pub client_uuid: ClientId,
    pub name: String,
    /// Recomputed whenever `name` changes.
    pub slug: String,
    /// Fully-qualified domain visitors use to enter the space.
    pub branded_domain: Option<String>,
    pub theme: Option<Theme>,
    pub entrance_uuid: Option<RoomId>,
}

impl Space {
    /// Builds an unsaved space carrying only its key and owning client.
    pub fn new(client_uuid: ClientId, name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            client_uuid,
            name: name.into(),
            slug: slug.into(),
            branded_domain: None,
            theme: None,
            entrance_uuid: None,
        }
    }
}
