//! Field-level merge policy between blueprint values and persisted values.
//!
//! # Responsibility
//! - Decide per entity kind which side wins when both supply a field.
//! - Never blank out a persisted value because a blueprint omitted it.
//!
//! # Invariants
//! - Spec-authoritative kinds (client, space, room, person): a non-blank
//!   blueprint value overwrites; a blank or absent one keeps the persisted value.
//! - Runtime-authoritative kinds (furniture settings, utility configuration):
//!   a non-blank persisted value always survives; blueprint values only seed
//!   fields that are blank or missing.
//! - Fields known to only one side pass through unchanged, blank or not.
//! - Merges are applied to one entity at a time.

use crate::blueprint::spec::{FurnitureSpec, MemberProfile, RoomSpec, SpaceSpec, UtilityHookupSpec};
use crate::model::person::Person;
use crate::model::room::{FurniturePlacement, Room};
use crate::model::slug::slugify;
use crate::model::space::Space;
use crate::model::utility::UtilityHookup;
use crate::model::{EntityKind, FieldMap};
use serde_json::Value;

/// Which side wins a field both sides supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeDirection {
    SpecAuthoritative,
    RuntimeAuthoritative,
}

/// Declared merge direction for one entity kind.
pub const fn merge_direction(kind: EntityKind) -> MergeDirection {
    match kind {
        EntityKind::FurniturePlacement | EntityKind::UtilityHookup => {
            MergeDirection::RuntimeAuthoritative
        }
        EntityKind::Client
        | EntityKind::Space
        | EntityKind::Room
        | EntityKind::Person
        | EntityKind::Membership => MergeDirection::SpecAuthoritative,
    }
}

/// Whether a JSON value counts as "not set".
///
/// `null`, whitespace-only strings, empty arrays and empty objects are blank.
/// Booleans and numbers are never blank, so `false`/`0` survive as real values.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Merges two opaque field maps key by key.
pub fn merge_fields(existing: &FieldMap, spec: &FieldMap, direction: MergeDirection) -> FieldMap {
    let mut merged = existing.clone();
    for (key, spec_value) in spec {
        if is_blank(spec_value) {
            if !merged.contains_key(key) {
                merged.insert(key.clone(), spec_value.clone());
            }
            continue;
        }
        let keep_existing = direction == MergeDirection::RuntimeAuthoritative
            && merged.get(key).is_some_and(|current| !is_blank(current));
        if !keep_existing {
            merged.insert(key.clone(), spec_value.clone());
        }
    }
    merged
}

/// Merges one typed optional field.
pub fn merge_value<T: Clone>(
    existing: Option<&T>,
    spec: Option<&T>,
    direction: MergeDirection,
) -> Option<T> {
    match (existing, spec, direction) {
        (Some(current), Some(_), MergeDirection::RuntimeAuthoritative) => Some(current.clone()),
        (_, Some(value), _) => Some(value.clone()),
        (current, None, _) => current.cloned(),
    }
}

/// Like [`merge_value`], treating whitespace-only text as absent on both sides.
pub fn merge_text<'a>(
    existing: Option<&'a str>,
    spec: Option<&'a str>,
    direction: MergeDirection,
) -> Option<String> {
    let present = |value: Option<&'a str>| value.filter(|text| !text.trim().is_empty());
    let winner = match (present(existing), present(spec), direction) {
        (Some(current), Some(_), MergeDirection::RuntimeAuthoritative) => Some(current),
        (_, Some(value), _) => Some(value),
        // A persisted blank string stays blank; it does not become NULL.
        (_, None, _) => existing,
    };
    winner.map(str::to_string)
}

/// Produces the merged version of a persisted entity for one blueprint node.
///
/// Natural-key fields are not touched here except where a blueprint is
/// allowed to rename (a space reconciled by identity).
pub trait Reconcile<S: ?Sized> {
    const KIND: EntityKind;

    fn merged_with(&self, spec: &S) -> Self;
}

impl Reconcile<SpaceSpec> for Space {
    const KIND: EntityKind = EntityKind::Space;

    fn merged_with(&self, spec: &SpaceSpec) -> Self {
        let direction = merge_direction(EntityKind::Space);
        let mut merged = self.clone();
        let name = merge_text(Some(self.name.as_str()), Some(spec.name.as_str()), direction)
            .map(|name| name.trim().to_string());
        if let Some(name) = name {
            if name != self.name {
                if let Some(slug) = slugify(&name) {
                    merged.name = name;
                    merged.slug = slug;
                }
            }
        }
        merged.branded_domain = merge_text(
            self.branded_domain.as_deref(),
            spec.branded_domain.as_deref(),
            direction,
        );
        merged.theme = merge_value(self.theme.as_ref(), spec.theme.as_ref(), direction);
        merged
    }
}

impl Reconcile<RoomSpec> for Room {
    const KIND: EntityKind = EntityKind::Room;

    fn merged_with(&self, spec: &RoomSpec) -> Self {
        let direction = merge_direction(EntityKind::Room);
        let mut merged = self.clone();
        if let Some(level) =
            merge_value(Some(&self.access_level), spec.access_level.as_ref(), direction)
        {
            merged.access_level = level;
        }
        merged.publicity_level = merge_value(
            self.publicity_level.as_ref(),
            spec.publicity_level.as_ref(),
            direction,
        );
        merged.access_code = merge_text(
            self.access_code.as_deref(),
            spec.access_code.as_deref(),
            direction,
        );
        merged
    }
}

impl Reconcile<FurnitureSpec> for FurniturePlacement {
    const KIND: EntityKind = EntityKind::FurniturePlacement;

    /// The kind tag always follows the blueprint's entry for this slot; only
    /// settings are runtime-owned.
    fn merged_with(&self, spec: &FurnitureSpec) -> Self {
        let mut merged = self.clone();
        merged.furniture_kind = spec.kind.trim().to_string();
        merged.settings = merge_fields(
            &self.settings,
            &spec.settings,
            merge_direction(EntityKind::FurniturePlacement),
        );
        merged
    }
}

impl Reconcile<UtilityHookupSpec> for UtilityHookup {
    const KIND: EntityKind = EntityKind::UtilityHookup;

    fn merged_with(&self, spec: &UtilityHookupSpec) -> Self {
        let mut merged = self.clone();
        merged.utility_kind = spec.kind.trim().to_string();
        merged.configuration = merge_fields(
            &self.configuration,
            &spec.configuration,
            merge_direction(EntityKind::UtilityHookup),
        );
        merged
    }
}

impl Reconcile<MemberProfile> for Person {
    const KIND: EntityKind = EntityKind::Person;

    fn merged_with(&self, spec: &MemberProfile) -> Self {
        let mut merged = self.clone();
        merged.name = merge_text(
            self.name.as_deref(),
            spec.name.as_deref(),
            merge_direction(EntityKind::Person),
        );
        merged
    }
}
