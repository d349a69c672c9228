//! Client/space/room/furniture/utility repository contracts and SQLite
//! implementation.
//!
//! # Responsibility
//! - Provide natural-key lookups scoped the way blueprints address entities.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Room, furniture and utility listings are deterministic: rooms and
//!   hookups in insertion order, furniture by ascending slot.
//! - Updates never touch runtime-owned columns (`utility_hookups.status`).

use crate::model::room::{AccessLevel, FurniturePlacement, PublicityLevel, Room, RoomId};
use crate::model::space::{Client, Space, SpaceId, Theme};
use crate::model::utility::{UtilityHookup, UtilityStatus};
use crate::model::EntityKind;
use crate::repo::{
    classify_write_error, encode_fields, ensure_connection_ready, fields_column, optional_uuid_column,
    query_all, query_optional, uuid_column, RepoError, RepoResult,
};
use rusqlite::{params, Connection, Row};

const CLIENT_SELECT_SQL: &str = "SELECT uuid, name, slug FROM clients";

const SPACE_SELECT_SQL: &str = "SELECT
    uuid,
    client_uuid,
    name,
    slug,
    branded_domain,
    theme,
    entrance_uuid
FROM spaces";

const ROOM_SELECT_SQL: &str = "SELECT
    uuid,
    space_uuid,
    name,
    slug,
    access_level,
    publicity_level,
    access_code
FROM rooms";

const FURNITURE_SELECT_SQL: &str = "SELECT
    uuid,
    room_uuid,
    slot,
    furniture_kind,
    settings
FROM furniture_placements";

const UTILITY_SELECT_SQL: &str = "SELECT
    uuid,
    space_uuid,
    name,
    utility_kind,
    status,
    configuration
FROM utility_hookups";

/// Store operations for clients, spaces and everything a space owns.
pub trait SpaceRepository {
    fn find_client_by_name(&self, name: &str) -> RepoResult<Option<Client>>;
    fn create_client(&self, client: &Client) -> RepoResult<()>;

    fn get_space(&self, uuid: SpaceId) -> RepoResult<Option<Space>>;
    fn find_space_by_name(&self, name: &str) -> RepoResult<Option<Space>>;
    fn create_space(&self, space: &Space) -> RepoResult<()>;
    /// Writes every structural column, including `entrance_uuid`.
    fn update_space(&self, space: &Space) -> RepoResult<()>;

    fn find_room(&self, space_uuid: SpaceId, name: &str) -> RepoResult<Option<Room>>;
    fn find_room_by_slug(&self, space_uuid: SpaceId, slug: &str) -> RepoResult<Option<Room>>;
    fn list_rooms(&self, space_uuid: SpaceId) -> RepoResult<Vec<Room>>;
    fn create_room(&self, room: &Room) -> RepoResult<()>;
    fn update_room(&self, room: &Room) -> RepoResult<()>;

    fn find_furniture_placement(
        &self,
        room_uuid: RoomId,
        slot: u32,
    ) -> RepoResult<Option<FurniturePlacement>>;
    fn list_furniture_placements(&self, room_uuid: RoomId) -> RepoResult<Vec<FurniturePlacement>>;
    fn create_furniture_placement(&self, placement: &FurniturePlacement) -> RepoResult<()>;
    fn update_furniture_placement(&self, placement: &FurniturePlacement) -> RepoResult<()>;

    fn find_utility_hookup(
        &self,
        space_uuid: SpaceId,
        name: &str,
    ) -> RepoResult<Option<UtilityHookup>>;
    fn list_utility_hookups(&self, space_uuid: SpaceId) -> RepoResult<Vec<UtilityHookup>>;
    fn create_utility_hookup(&self, hookup: &UtilityHookup) -> RepoResult<()>;
    /// Writes kind and configuration; leaves `status` alone.
    fn update_utility_hookup(&self, hookup: &UtilityHookup) -> RepoResult<()>;
}

/// SQLite-backed space repository.
pub struct SqliteSpaceRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSpaceRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            &[
                "clients",
                "spaces",
                "rooms",
                "furniture_placements",
                "utility_hookups",
            ],
        )?;
        Ok(Self { conn })
    }
}

impl SpaceRepository for SqliteSpaceRepository<'_> {
    fn find_client_by_name(&self, name: &str) -> RepoResult<Option<Client>> {
        query_optional(
            self.conn,
            &format!("{CLIENT_SELECT_SQL} WHERE name = ?1;"),
            [name],
            parse_client_row,
        )
    }

    fn create_client(&self, client: &Client) -> RepoResult<()> {
        self.conn
            .execute(
                "INSERT INTO clients (uuid, name, slug) VALUES (?1, ?2, ?3);",
                params![client.uuid.to_string(), client.name, client.slug],
            )
            .map_err(|err| classify_write_error(EntityKind::Client, err))?;
        Ok(())
    }

    fn get_space(&self, uuid: SpaceId) -> RepoResult<Option<Space>> {
        query_optional(
            self.conn,
            &format!("{SPACE_SELECT_SQL} WHERE uuid = ?1;"),
            [uuid.to_string()],
            parse_space_row,
        )
    }

    fn find_space_by_name(&self, name: &str) -> RepoResult<Option<Space>> {
        query_optional(
            self.conn,
            &format!("{SPACE_SELECT_SQL} WHERE name = ?1;"),
            [name],
            parse_space_row,
        )
    }

    fn create_space(&self, space: &Space) -> RepoResult<()> {
        self.conn
            .execute(
                "INSERT INTO spaces (
                    uuid,
                    client_uuid,
                    name,
                    slug,
                    branded_domain,
                    theme,
                    entrance_uuid
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
                params![
                    space.uuid.to_string(),
                    space.client_uuid.to_string(),
                    space.name,
                    space.slug,
                    space.branded_domain,
                    space.theme.map(Theme::as_str),
                    space.entrance_uuid.map(|uuid| uuid.to_string()),
                ],
            )
            .map_err(|err| classify_write_error(EntityKind::Space, err))?;
        Ok(())
    }

    fn update_space(&self, space: &Space) -> RepoResult<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE spaces
                 SET
                    name = ?2,
                    slug = ?3,
                    branded_domain = ?4,
                    theme = ?5,
                    entrance_uuid = ?6,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE uuid = ?1;",
                params![
                    space.uuid.to_string(),
                    space.name,
                    space.slug,
                    space.branded_domain,
                    space.theme.map(Theme::as_str),
                    space.entrance_uuid.map(|uuid| uuid.to_string()),
                ],
            )
            .map_err(|err| classify_write_error(EntityKind::Space, err))?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                kind: EntityKind::Space,
                uuid: space.uuid,
            });
        }
        Ok(())
    }

    fn find_room(&self, space_uuid: SpaceId, name: &str) -> RepoResult<Option<Room>> {
        query_optional(
            self.conn,
            &format!("{ROOM_SELECT_SQL} WHERE space_uuid = ?1 AND name = ?2;"),
            params![space_uuid.to_string(), name],
            parse_room_row,
        )
    }

    fn find_room_by_slug(&self, space_uuid: SpaceId, slug: &str) -> RepoResult<Option<Room>> {
        query_optional(
            self.conn,
            &format!("{ROOM_SELECT_SQL} WHERE space_uuid = ?1 AND slug = ?2;"),
            params![space_uuid.to_string(), slug],
            parse_room_row,
        )
    }

    fn list_rooms(&self, space_uuid: SpaceId) -> RepoResult<Vec<Room>> {
        query_all(
            self.conn,
            &format!("{ROOM_SELECT_SQL} WHERE space_uuid = ?1 ORDER BY rowid ASC;"),
            [space_uuid.to_string()],
            parse_room_row,
        )
    }

    fn create_room(&self, room: &Room) -> RepoResult<()> {
        self.conn
            .execute(
                "INSERT INTO rooms (
                    uuid,
                    space_uuid,
                    name,
                    slug,
                    access_level,
                    publicity_level,
                    access_code
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
                params![
                    room.uuid.to_string(),
                    room.space_uuid.to_string(),
                    room.name,
                    room.slug,
                    room.access_level.as_str(),
                    room.publicity_level.map(PublicityLevel::as_str),
                    room.access_code,
                ],
            )
            .map_err(|err| classify_write_error(EntityKind::Room, err))?;
        Ok(())
    }

    fn update_room(&self, room: &Room) -> RepoResult<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE rooms
                 SET
                    name = ?2,
                    slug = ?3,
                    access_level = ?4,
                    publicity_level = ?5,
                    access_code = ?6,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE uuid = ?1;",
                params![
                    room.uuid.to_string(),
                    room.name,
                    room.slug,
                    room.access_level.as_str(),
                    room.publicity_level.map(PublicityLevel::as_str),
                    room.access_code,
                ],
            )
            .map_err(|err| classify_write_error(EntityKind::Room, err))?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                kind: EntityKind::Room,
                uuid: room.uuid,
            });
        }
        Ok(())
    }

    fn find_furniture_placement(
        &self,
        room_uuid: RoomId,
        slot: u32,
    ) -> RepoResult<Option<FurniturePlacement>> {
        query_optional(
            self.conn,
            &format!("{FURNITURE_SELECT_SQL} WHERE room_uuid = ?1 AND slot = ?2;"),
            params![room_uuid.to_string(), slot],
            parse_furniture_row,
        )
    }

    fn list_furniture_placements(&self, room_uuid: RoomId) -> RepoResult<Vec<FurniturePlacement>> {
        query_all(
            self.conn,
            &format!("{FURNITURE_SELECT_SQL} WHERE room_uuid = ?1 ORDER BY slot ASC;"),
            [room_uuid.to_string()],
            parse_furniture_row,
        )
    }

    fn create_furniture_placement(&self, placement: &FurniturePlacement) -> RepoResult<()> {
        self.conn
            .execute(
                "INSERT INTO furniture_placements (
                    uuid,
                    room_uuid,
                    slot,
                    furniture_kind,
                    settings
                ) VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    placement.uuid.to_string(),
                    placement.room_uuid.to_string(),
                    placement.slot,
                    placement.furniture_kind,
                    encode_fields(&placement.settings)?,
                ],
            )
            .map_err(|err| classify_write_error(EntityKind::FurniturePlacement, err))?;
        Ok(())
    }

    fn update_furniture_placement(&self, placement: &FurniturePlacement) -> RepoResult<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE furniture_placements
                 SET
                    furniture_kind = ?2,
                    settings = ?3,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE uuid = ?1;",
                params![
                    placement.uuid.to_string(),
                    placement.furniture_kind,
                    encode_fields(&placement.settings)?,
                ],
            )
            .map_err(|err| classify_write_error(EntityKind::FurniturePlacement, err))?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                kind: EntityKind::FurniturePlacement,
                uuid: placement.uuid,
            });
        }
        Ok(())
    }

    fn find_utility_hookup(
        &self,
        space_uuid: SpaceId,
        name: &str,
    ) -> RepoResult<Option<UtilityHookup>> {
        query_optional(
            self.conn,
            &format!("{UTILITY_SELECT_SQL} WHERE space_uuid = ?1 AND name = ?2;"),
            params![space_uuid.to_string(), name],
            parse_utility_row,
        )
    }

    fn list_utility_hookups(&self, space_uuid: SpaceId) -> RepoResult<Vec<UtilityHookup>> {
        query_all(
            self.conn,
            &format!("{UTILITY_SELECT_SQL} WHERE space_uuid = ?1 ORDER BY rowid ASC;"),
            [space_uuid.to_string()],
            parse_utility_row,
        )
    }

    fn create_utility_hookup(&self, hookup: &UtilityHookup) -> RepoResult<()> {
        self.conn
            .execute(
                "INSERT INTO utility_hookups (
                    uuid,
                    space_uuid,
                    name,
                    utility_kind,
                    status,
                    configuration
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                params![
                    hookup.uuid.to_string(),
                    hookup.space_uuid.to_string(),
                    hookup.name,
                    hookup.utility_kind,
                    hookup.status.as_str(),
                    encode_fields(&hookup.configuration)?,
                ],
            )
            .map_err(|err| classify_write_error(EntityKind::UtilityHookup, err))?;
        Ok(())
    }

    fn update_utility_hookup(&self, hookup: &UtilityHookup) -> RepoResult<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE utility_hookups
                 SET
                    utility_kind = ?2,
                    configuration = ?3,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE uuid = ?1;",
                params![
                    hookup.uuid.to_string(),
                    hookup.utility_kind,
                    encode_fields(&hookup.configuration)?,
                ],
            )
            .map_err(|err| classify_write_error(EntityKind::UtilityHookup, err))?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                kind: EntityKind::UtilityHookup,
                uuid: hookup.uuid,
            });
        }
        Ok(())
    }
}

fn parse_client_row(row: &Row<'_>) -> RepoResult<Client> {
    Ok(Client {
        uuid: uuid_column(row, "uuid")?,
        name: row.get("name")?,
        slug: row.get("slug")?,
    })
}

fn parse_space_row(row: &Row<'_>) -> RepoResult<Space> {
    let theme = match row.get::<_, Option<String>>("theme")? {
        Some(value) => Some(Theme::parse(&value).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid theme `{value}` in spaces.theme"))
        })?),
        None => None,
    };

    Ok(Space {
        uuid: uuid_column(row, "uuid")?,
        client_uuid: uuid_column(row, "client_uuid")?,
        name: row.get("name")?,
        slug: row.get("slug")?,
        branded_domain: row.get("branded_domain")?,
        theme,
        entrance_uuid: optional_uuid_column(row, "entrance_uuid")?,
    })
}

fn parse_room_row(row: &Row<'_>) -> RepoResult<Room> {
    let access_text: String = row.get("access_level")?;
    let access_level = AccessLevel::parse(&access_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid access level `{access_text}` in rooms.access_level"
        ))
    })?;

    let publicity_level = match row.get::<_, Option<String>>("publicity_level")? {
        Some(value) => Some(PublicityLevel::parse(&value).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid publicity level `{value}` in rooms.publicity_level"
            ))
        })?),
        None => None,
    };

    Ok(Room {
        uuid: uuid_column(row, "uuid")?,
        space_uuid: uuid_column(row, "space_uuid")?,
        name: row.get("name")?,
        slug: row.get("slug")?,
        access_level,
        publicity_level,
        access_code: row.get("access_code")?,
    })
}

fn parse_furniture_row(row: &Row<'_>) -> RepoResult<FurniturePlacement> {
    let slot: i64 = row.get("slot")?;
    let slot = u32::try_from(slot).map_err(|_| {
        RepoError::InvalidData(format!("invalid slot `{slot}` in furniture_placements.slot"))
    })?;

    Ok(FurniturePlacement {
        uuid: uuid_column(row, "uuid")?,
        room_uuid: uuid_column(row, "room_uuid")?,
        slot,
        furniture_kind: row.get("furniture_kind")?,
        settings: fields_column(row, "settings")?,
    })
}

fn parse_utility_row(row: &Row<'_>) -> RepoResult<UtilityHookup> {
    let status_text: String = row.get("status")?;
    let status = UtilityStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid status `{status_text}` in utility_hookups.status"
        ))
    })?;

    Ok(UtilityHookup {
        uuid: uuid_column(row, "uuid")?,
        space_uuid: uuid_column(row, "space_uuid")?,
        name: row.get("name")?,
        utility_kind: row.get("utility_kind")?,
        status,
        configuration: fields_column(row, "configuration")?,
    })
}
