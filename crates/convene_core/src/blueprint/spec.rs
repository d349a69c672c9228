//! Declarative blueprint tree: the desired state of one client's space.
//!
//! # Invariants
//! - A blueprint is immutable for the duration of a reconciliation pass.
//! - Furniture keeps the order it was written in; that order assigns slots.

use crate::model::person::PersonId;
use crate::model::room::{AccessLevel, PublicityLevel};
use crate::model::space::Theme;
use crate::model::FieldMap;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::Formatter;

/// Root of a blueprint: a client and the one space it should own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSpec {
    pub name: String,
    pub space: SpaceSpec,
}

impl ClientSpec {
    pub fn new(name: impl Into<String>, space: SpaceSpec) -> Self {
        Self {
            name: name.into(),
            space,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpaceSpec {
    /// Natural key when resolving by name; a rename when reconciling an
    /// existing space. Blank leaves the persisted name alone.
    pub name: String,
    pub branded_domain: Option<String>,
    pub theme: Option<Theme>,
    /// Room name (or slug) to use as the entrance.
    pub entrance: Option<String>,
    pub rooms: Vec<RoomSpec>,
    pub utility_hookups: Vec<UtilityHookupSpec>,
    pub members: Vec<MemberSpec>,
}

impl SpaceSpec {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_branded_domain(mut self, domain: impl Into<String>) -> Self {
        self.branded_domain = Some(domain.into());
        self
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = Some(theme);
        self
    }

    pub fn with_entrance(mut self, room: impl Into<String>) -> Self {
        self.entrance = Some(room.into());
        self
    }

    pub fn with_room(mut self, room: RoomSpec) -> Self {
        self.rooms.push(room);
        self
    }

    pub fn with_utility_hookup(mut self, hookup: UtilityHookupSpec) -> Self {
        self.utility_hookups.push(hookup);
        self
    }

    pub fn with_member(mut self, member: MemberSpec) -> Self {
        self.members.push(member);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomSpec {
    pub name: String,
    #[serde(default)]
    pub access_level: Option<AccessLevel>,
    #[serde(default)]
    pub publicity_level: Option<PublicityLevel>,
    #[serde(default)]
    pub access_code: Option<String>,
    #[serde(default, alias = "furniture_placements")]
    pub furniture: FurnitureLayout,
}

impl RoomSpec {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_access_level(mut self, level: AccessLevel) -> Self {
        self.access_level = Some(level);
        self
    }

    pub fn with_publicity_level(mut self, level: PublicityLevel) -> Self {
        self.publicity_level = Some(level);
        self
    }

    pub fn with_access_code(mut self, code: impl Into<String>) -> Self {
        self.access_code = Some(code.into());
        self
    }

    /// Appends furniture; its slot is its position in this room's layout.
    pub fn with_furniture(mut self, kind: impl Into<String>, settings: FieldMap) -> Self {
        self.furniture.0.push(FurnitureSpec {
            kind: kind.into(),
            settings,
        });
        self
    }
}

/// One `kind -> settings` entry of a room's furniture mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct FurnitureSpec {
    pub kind: String,
    pub settings: FieldMap,
}

/// Ordered furniture mapping of a room.
///
/// Serialized as a JSON object whose key order is significant: entry `i`
/// lands in slot `i`. Removing or reordering entries moves which persisted
/// placement (and its runtime customizations) a kind ends up in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FurnitureLayout(pub Vec<FurnitureSpec>);

impl FurnitureLayout {
    pub fn iter(&self) -> impl Iterator<Item = &FurnitureSpec> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for FurnitureLayout {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for entry in &self.0 {
            map.serialize_entry(&entry.kind, &entry.settings)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FurnitureLayout {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(FurnitureLayoutVisitor)
    }
}

struct FurnitureLayoutVisitor;

impl<'de> Visitor<'de> for FurnitureLayoutVisitor {
    type Value = FurnitureLayout;

    fn expecting(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("a map of furniture kind to settings object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
        // `null` settings (`video_bridge: null`) mean "no settings".
        while let Some((kind, settings)) = access.next_entry::<String, Option<FieldMap>>()? {
            entries.push(FurnitureSpec {
                kind,
                settings: settings.unwrap_or_default(),
            });
        }
        Ok(FurnitureLayout(entries))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtilityHookupSpec {
    pub name: String,
    #[serde(alias = "utility_slug")]
    pub kind: String,
    #[serde(default)]
    pub configuration: FieldMap,
}

impl UtilityHookupSpec {
    pub fn new(name: impl Into<String>, kind: impl Into<String>, configuration: FieldMap) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            configuration,
        }
    }
}

/// A member is either an already-resolved person or an email with profile
/// fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MemberSpec {
    Existing { person_id: PersonId },
    Profile(MemberProfile),
}

impl MemberSpec {
    pub fn email(email: impl Into<String>) -> Self {
        Self::Profile(MemberProfile {
            email: email.into(),
            name: None,
        })
    }

    pub fn existing(person_id: PersonId) -> Self {
        Self::Existing { person_id }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberProfile {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::{ClientSpec, MemberSpec};
    use serde_json::json;

    #[test]
    fn furniture_mapping_keeps_written_order() {
        let spec: ClientSpec = serde_json::from_value(json!({
            "name": "Zinc",
            "space": {
                "name": "Zinc",
                "rooms": [{
                    "name": "Lobby",
                    "furniture_placements": {
                        "video_bridge": {},
                        "markdown_text_block": { "content": "# Welcome!" },
                        "breakout_tables_by_jitsi": null
                    }
                }]
            }
        }))
        .unwrap();

        let kinds: Vec<&str> = spec.space.rooms[0]
            .furniture
            .iter()
            .map(|entry| entry.kind.as_str())
            .collect();
        assert_eq!(
            kinds,
            vec!["video_bridge", "markdown_text_block", "breakout_tables_by_jitsi"]
        );
        assert!(spec.space.rooms[0].furniture.0[2].settings.is_empty());
    }

    #[test]
    fn members_deserialize_as_reference_or_profile() {
        let person_id = uuid::Uuid::new_v4();
        let members: Vec<MemberSpec> = serde_json::from_value(json!([
            { "person_id": person_id },
            { "email": "zee@zinc.coop", "name": "Zee" }
        ]))
        .unwrap();

        assert_eq!(members[0], MemberSpec::existing(person_id));
        assert!(matches!(
            &members[1],
            MemberSpec::Profile(profile) if profile.email == "zee@zinc.coop"
        ));
    }

    #[test]
    fn utility_kind_accepts_legacy_slug_field() {
        let spec: super::UtilityHookupSpec = serde_json::from_value(json!({
            "name": "Jitsi",
            "utility_slug": "jitsi",
            "configuration": { "meet_domain": "meet.example.com" }
        }))
        .unwrap();
        assert_eq!(spec.kind, "jitsi");
    }
}
