//! Natural-key identity resolution.
//!
//! # Responsibility
//! - Validate one blueprint node's key fields before anything is written.
//! - Find the persisted entity addressed by that key inside its parent scope,
//!   or build an unsaved one carrying only the key.
//!
//! # Invariants
//! - Resolution never writes; the orchestrator persists after merging.
//! - A key that matches data owned by a different parent is a
//!   `UniquenessViolation`, never a silent re-parenting.

use crate::blueprint::error::{BlueprintError, BlueprintResult};
use crate::blueprint::spec::{FurnitureSpec, MemberProfile, RoomSpec, UtilityHookupSpec};
use crate::model::person::{normalize_email, Membership, Person, PersonId};
use crate::model::room::{FurniturePlacement, Room};
use crate::model::slug::slugify;
use crate::model::space::{Client, Space, SpaceId};
use crate::model::utility::UtilityHookup;
use crate::model::EntityKind;
use crate::registry::{KindFamily, KindRegistry};
use crate::repo::people_repo::PeopleRepository;
use crate::repo::space_repo::SpaceRepository;
use crate::repo::RepoError;

/// Lookup-or-build result for one node.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    pub entity: T,
    /// `true` when nothing was persisted under the key yet.
    pub is_new: bool,
}

impl<T> Resolved<T> {
    fn existing(entity: T) -> Self {
        Self {
            entity,
            is_new: false,
        }
    }

    fn new(entity: T) -> Self {
        Self {
            entity,
            is_new: true,
        }
    }
}

/// Trimmed name plus its slug, or a `ValidationError` for `key`.
fn keyed_name(kind: EntityKind, key: &str, name: &str) -> BlueprintResult<(String, String)> {
    let name = name.trim();
    if name.is_empty() {
        return Err(BlueprintError::validation(kind, key, "name", "must not be blank"));
    }
    let slug = slugify(name).ok_or_else(|| {
        BlueprintError::validation(kind, key, "name", "must contain a letter or digit")
    })?;
    Ok((name.to_string(), slug))
}

fn registered_kind(
    registry: &KindRegistry,
    family: KindFamily,
    entity: EntityKind,
    key: &str,
    kind: &str,
) -> BlueprintResult<String> {
    let kind = kind.trim();
    if kind.is_empty() {
        return Err(BlueprintError::validation(entity, key, "kind", "must not be blank"));
    }
    if !registry.contains(family, kind) {
        return Err(BlueprintError::validation(
            entity,
            key,
            "kind",
            format!("`{kind}` is not a registered {family} kind"),
        ));
    }
    Ok(kind.to_string())
}

pub fn resolve_client<S: SpaceRepository>(spaces: &S, name: &str) -> BlueprintResult<Resolved<Client>> {
    let (name, slug) = keyed_name(EntityKind::Client, name, name)?;
    match spaces.find_client_by_name(&name)? {
        Some(client) => Ok(Resolved::existing(client)),
        None => Ok(Resolved::new(Client::new(name, slug))),
    }
}

/// Resolves a space by its globally unique name under `client`.
pub fn resolve_space<S: SpaceRepository>(
    spaces: &S,
    client: &Client,
    name: &str,
) -> BlueprintResult<Resolved<Space>> {
    let (name, slug) = keyed_name(EntityKind::Space, name, name)?;
    match spaces.find_space_by_name(&name)? {
        Some(space) if space.client_uuid != client.uuid => {
            Err(BlueprintError::UniquenessViolation {
                kind: EntityKind::Space,
                key: name,
                field: Some("client".to_string()),
                detail: format!("space already belongs to client {}", space.client_uuid),
            })
        }
        Some(space) => Ok(Resolved::existing(space)),
        None => Ok(Resolved::new(Space::new(client.uuid, name, slug))),
    }
}

/// Loads a space the caller already holds by identity.
///
/// A blank blueprint name is allowed here; a non-blank one must still slug.
pub fn resolve_space_by_id<S: SpaceRepository>(
    spaces: &S,
    space_uuid: SpaceId,
    name: &str,
) -> BlueprintResult<Resolved<Space>> {
    if !name.trim().is_empty() {
        keyed_name(EntityKind::Space, name, name)?;
    }
    let space = spaces.get_space(space_uuid)?.ok_or(RepoError::NotFound {
        kind: EntityKind::Space,
        uuid: space_uuid,
    })?;
    Ok(Resolved::existing(space))
}

/// Resolves a room by name within `space`. `position` labels unnamed rooms
/// in errors.
pub fn resolve_room<S: SpaceRepository>(
    spaces: &S,
    space: &Space,
    position: usize,
    spec: &RoomSpec,
) -> BlueprintResult<Resolved<Room>> {
    let key = room_key(position, spec);
    let (name, slug) = keyed_name(EntityKind::Room, &key, &spec.name)?;
    match spaces.find_room(space.uuid, &name)? {
        Some(room) => Ok(Resolved::existing(room)),
        None => Ok(Resolved::new(Room::new(space.uuid, name, slug))),
    }
}

pub(crate) fn room_key(position: usize, spec: &RoomSpec) -> String {
    let name = spec.name.trim();
    if name.is_empty() {
        format!("rooms[{position}]")
    } else {
        name.to_string()
    }
}

/// Resolves the placement at positional `slot` of `room`.
pub fn resolve_furniture_placement<S: SpaceRepository>(
    spaces: &S,
    registry: &KindRegistry,
    room: &Room,
    slot: usize,
    spec: &FurnitureSpec,
) -> BlueprintResult<Resolved<FurniturePlacement>> {
    let key = format!("{}#{slot}", room.name);
    let kind = registered_kind(
        registry,
        KindFamily::Furniture,
        EntityKind::FurniturePlacement,
        &key,
        &spec.kind,
    )?;
    let slot = u32::try_from(slot).map_err(|_| {
        BlueprintError::validation(
            EntityKind::FurniturePlacement,
            &key,
            "slot",
            "exceeds the supported number of placements",
        )
    })?;
    match spaces.find_furniture_placement(room.uuid, slot)? {
        Some(placement) => Ok(Resolved::existing(placement)),
        None => Ok(Resolved::new(FurniturePlacement::new(room.uuid, slot, kind))),
    }
}

pub fn resolve_utility_hookup<S: SpaceRepository>(
    spaces: &S,
    registry: &KindRegistry,
    space: &Space,
    position: usize,
    spec: &UtilityHookupSpec,
) -> BlueprintResult<Resolved<UtilityHookup>> {
    let trimmed = spec.name.trim();
    let key = if trimmed.is_empty() {
        format!("utility_hookups[{position}]")
    } else {
        trimmed.to_string()
    };
    if trimmed.is_empty() {
        return Err(BlueprintError::validation(
            EntityKind::UtilityHookup,
            key,
            "name",
            "must not be blank",
        ));
    }
    let kind = registered_kind(
        registry,
        KindFamily::Utility,
        EntityKind::UtilityHookup,
        &key,
        &spec.kind,
    )?;
    match spaces.find_utility_hookup(space.uuid, trimmed)? {
        Some(hookup) => Ok(Resolved::existing(hookup)),
        None => Ok(Resolved::new(UtilityHookup::new(space.uuid, trimmed, kind))),
    }
}

/// Finds the entrance room among the space's persisted rooms, by name first
/// and slug second.
pub fn resolve_entrance<S: SpaceRepository>(
    spaces: &S,
    space: &Space,
    reference: &str,
) -> BlueprintResult<Room> {
    let reference = reference.trim();
    if let Some(room) = spaces.find_room(space.uuid, reference)? {
        return Ok(room);
    }
    if let Some(slug) = slugify(reference) {
        if let Some(room) = spaces.find_room_by_slug(space.uuid, &slug)? {
            return Ok(room);
        }
    }
    Err(BlueprintError::Reference {
        kind: EntityKind::Space,
        key: space.name.clone(),
        field: "entrance",
        target: reference.to_string(),
    })
}

/// Resolves a person by normalized email.
pub fn resolve_person<P: PeopleRepository>(
    people: &P,
    profile: &MemberProfile,
) -> BlueprintResult<Resolved<Person>> {
    let email = normalize_email(&profile.email).ok_or_else(|| {
        BlueprintError::validation(
            EntityKind::Person,
            profile.email.trim(),
            "email",
            "must look like `local@domain`",
        )
    })?;
    match people.find_person_by_email(&email)? {
        Some(person) => Ok(Resolved::existing(person)),
        None => Ok(Resolved::new(Person::new(email))),
    }
}

/// Loads a person the blueprint references by identity.
pub fn resolve_person_by_id<P: PeopleRepository>(
    people: &P,
    person_uuid: PersonId,
) -> BlueprintResult<Person> {
    people
        .get_person(person_uuid)?
        .ok_or_else(|| BlueprintError::Reference {
            kind: EntityKind::Membership,
            key: person_uuid.to_string(),
            field: "person_id",
            target: person_uuid.to_string(),
        })
}

pub fn resolve_membership<P: PeopleRepository>(
    people: &P,
    person: &Person,
    space: &Space,
) -> BlueprintResult<Resolved<Membership>> {
    match people.find_membership(person.uuid, space.uuid)? {
        Some(membership) => Ok(Resolved::existing(membership)),
        None => Ok(Resolved::new(Membership::new(person.uuid, space.uuid))),
    }
}

#[cfg(test)]
mod tests {
    use super::{keyed_name, room_key};
    use crate::blueprint::error::BlueprintError;
    use crate::blueprint::spec::RoomSpec;
    use crate::model::EntityKind;

    #[test]
    fn keyed_name_trims_and_slugs() {
        let (name, slug) = keyed_name(EntityKind::Room, "Talk to Zee", "  Talk to Zee ").unwrap();
        assert_eq!(name, "Talk to Zee");
        assert_eq!(slug, "talk-to-zee");
    }

    #[test]
    fn keyed_name_rejects_blank_and_unsluggable_names() {
        let blank = keyed_name(EntityKind::Room, "rooms[0]", "   ");
        assert!(matches!(
            blank,
            Err(BlueprintError::Validation { field: "name", .. })
        ));
        let symbols = keyed_name(EntityKind::Space, "!!!", "!!!");
        assert!(matches!(
            symbols,
            Err(BlueprintError::Validation { kind: EntityKind::Space, .. })
        ));
    }

    #[test]
    fn unnamed_rooms_are_keyed_by_position() {
        assert_eq!(room_key(2, &RoomSpec::named("")), "rooms[2]");
        assert_eq!(room_key(2, &RoomSpec::named(" Lobby ")), "Lobby");
    }
}
