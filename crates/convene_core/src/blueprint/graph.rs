//! Fully resolved view of one space and everything it owns.

use crate::model::person::{Membership, Person};
use crate::model::room::{FurniturePlacement, Room};
use crate::model::space::{Space, SpaceId};
use crate::model::utility::UtilityHookup;
use crate::model::EntityKind;
use crate::repo::people_repo::PeopleRepository;
use crate::repo::space_repo::SpaceRepository;
use crate::repo::{RepoError, RepoResult};

/// A room with its furniture ordered by slot.
#[derive(Debug, Clone, PartialEq)]
pub struct FurnishedRoom {
    pub room: Room,
    pub furniture: Vec<FurniturePlacement>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub person: Person,
    pub membership: Membership,
}

/// Space returned by a reconciliation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct SpaceGraph {
    pub space: Space,
    /// Rooms in creation order.
    pub rooms: Vec<FurnishedRoom>,
    pub utility_hookups: Vec<UtilityHookup>,
    pub members: Vec<Member>,
}

impl SpaceGraph {
    /// Returns the room currently set as entrance, if any.
    pub fn entrance(&self) -> Option<&FurnishedRoom> {
        let entrance_uuid = self.space.entrance_uuid?;
        self.rooms
            .iter()
            .find(|entry| entry.room.uuid == entrance_uuid)
    }

    pub fn room(&self, name: &str) -> Option<&FurnishedRoom> {
        self.rooms.iter().find(|entry| entry.room.name == name)
    }

    pub fn utility_hookup(&self, name: &str) -> Option<&UtilityHookup> {
        self.utility_hookups
            .iter()
            .find(|hookup| hookup.name == name)
    }

    pub fn member(&self, email: &str) -> Option<&Member> {
        self.members
            .iter()
            .find(|member| member.person.email == email)
    }

    pub fn furniture_count(&self) -> usize {
        self.rooms.iter().map(|entry| entry.furniture.len()).sum()
    }
}

/// Reads one space and its owned entities back from the store.
pub(crate) fn load_graph<S, P>(spaces: &S, people: &P, space_uuid: SpaceId) -> RepoResult<SpaceGraph>
where
    S: SpaceRepository,
    P: PeopleRepository,
{
    let space = spaces
        .get_space(space_uuid)?
        .ok_or(RepoError::NotFound {
            kind: EntityKind::Space,
            uuid: space_uuid,
        })?;

    let mut rooms = Vec::new();
    for room in spaces.list_rooms(space_uuid)? {
        let furniture = spaces.list_furniture_placements(room.uuid)?;
        rooms.push(FurnishedRoom { room, furniture });
    }

    let mut members = Vec::new();
    for membership in people.list_memberships(space_uuid)? {
        let person = people
            .get_person(membership.person_uuid)?
            .ok_or(RepoError::NotFound {
                kind: EntityKind::Person,
                uuid: membership.person_uuid,
            })?;
        members.push(Member { person, membership });
    }

    Ok(SpaceGraph {
        space,
        rooms,
        utility_hookups: spaces.list_utility_hookups(space_uuid)?,
        members,
    })
}
