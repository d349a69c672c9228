//! People and their memberships in spaces.
//!
//! # Invariants
//! - `Person.email` is stored normalized and is globally unique.
//! - At most one membership exists per `(person, space)` pair.

use crate::model::space::SpaceId;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type PersonId = Uuid;
pub type MembershipId = Uuid;

static EMAIL_SHAPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+$").expect("valid email shape regex"));

/// Trims and lowercases an email so it can serve as a natural key.
///
/// Returns `None` when the value is blank or not shaped like `local@domain`.
pub fn normalize_email(value: &str) -> Option<String> {
    let normalized = value.trim().to_lowercase();
    if EMAIL_SHAPE_RE.is_match(&normalized) {
        Some(normalized)
    } else {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub uuid: PersonId,
    pub email: String,
    pub name: Option<String>,
}

impl Person {
    /// Builds an unsaved person; `email` must already be normalized.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            email: email.into(),
            name: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    #[default]
    Active,
    Revoked,
}

impl MembershipStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Revoked => "revoked",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "revoked" => Some(Self::Revoked),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub uuid: MembershipId,
    pub person_uuid: PersonId,
    pub space_uuid: SpaceId,
    pub status: MembershipStatus,
}

impl Membership {
    pub fn new(person_uuid: PersonId, space_uuid: SpaceId) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            person_uuid,
            space_uuid,
            status: MembershipStatus::default(),
        }
    }
}
