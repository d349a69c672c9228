//! Utility hookups: per-space integrations such as video bridges or payments.

use crate::model::space::SpaceId;
use crate::model::FieldMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UtilityHookupId = Uuid;

/// Operational state of a hookup. Owned by runtime workflows, never by
/// blueprints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UtilityStatus {
    #[default]
    Unavailable,
    Ready,
}

impl UtilityStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unavailable => "unavailable",
            Self::Ready => "ready",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "unavailable" => Some(Self::Unavailable),
            "ready" => Some(Self::Ready),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtilityHookup {
    pub uuid: UtilityHookupId,
    pub space_uuid: SpaceId,
    pub name: String,
    pub utility_kind: String,
    pub status: UtilityStatus,
    /// May contain credentials. Never logged.
    pub configuration: FieldMap,
}

impl UtilityHookup {
    pub fn new(space_uuid: SpaceId, name: impl Into<String>, utility_kind: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            space_uuid,
            name: name.into(),
            utility_kind: utility_kind.into(),
            status: UtilityStatus::default(),
            configuration: FieldMap::new(),
        }
    }
}
