//! People and membership repository contracts and SQLite implementation.
//!
//! # Invariants
//! - People are looked up by normalized email only.
//! - Membership creation relies on `UNIQUE(person_uuid, space_uuid)`; a second
//!   insert for the same pair is a `Conflict`, never a duplicate row.

use crate::model::person::{Membership, MembershipStatus, Person, PersonId};
use crate::model::space::SpaceId;
use crate::model::EntityKind;
use crate::repo::{
    classify_write_error, ensure_connection_ready, query_all, query_optional, uuid_column,
    RepoError, RepoResult,
};
use rusqlite::{params, Connection, Row};

const PERSON_SELECT_SQL: &str = "SELECT uuid, email, name FROM people";

const MEMBERSHIP_SELECT_SQL: &str = "SELECT
    uuid,
    person_uuid,
    space_uuid,
    status
FROM memberships";

/// Store operations for people and their memberships.
pub trait PeopleRepository {
    fn get_person(&self, uuid: PersonId) -> RepoResult<Option<Person>>;
    fn find_person_by_email(&self, email: &str) -> RepoResult<Option<Person>>;
    fn create_person(&self, person: &Person) -> RepoResult<()>;
    fn update_person(&self, person: &Person) -> RepoResult<()>;

    fn find_membership(
        &self,
        person_uuid: PersonId,
        space_uuid: SpaceId,
    ) -> RepoResult<Option<Membership>>;
    fn create_membership(&self, membership: &Membership) -> RepoResult<()>;
    /// Lists memberships of one space in creation order.
    fn list_memberships(&self, space_uuid: SpaceId) -> RepoResult<Vec<Membership>>;
}

/// SQLite-backed people repository.
pub struct SqlitePeopleRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePeopleRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["people", "memberships"])?;
        Ok(Self { conn })
    }
}

impl PeopleRepository for SqlitePeopleRepository<'_> {
    fn get_person(&self, uuid: PersonId) -> RepoResult<Option<Person>> {
        query_optional(
            self.conn,
            &format!("{PERSON_SELECT_SQL} WHERE uuid = ?1;"),
            [uuid.to_string()],
            parse_person_row,
        )
    }

    fn find_person_by_email(&self, email: &str) -> RepoResult<Option<Person>> {
        query_optional(
            self.conn,
            &format!("{PERSON_SELECT_SQL} WHERE email = ?1;"),
            [email],
            parse_person_row,
        )
    }

    fn create_person(&self, person: &Person) -> RepoResult<()> {
        self.conn
            .execute(
                "INSERT INTO people (uuid, email, name) VALUES (?1, ?2, ?3);",
                params![person.uuid.to_string(), person.email, person.name],
            )
            .map_err(|err| classify_write_error(EntityKind::Person, err))?;
        Ok(())
    }

    fn update_person(&self, person: &Person) -> RepoResult<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE people
                 SET
                    email = ?2,
                    name = ?3,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE uuid = ?1;",
                params![person.uuid.to_string(), person.email, person.name],
            )
            .map_err(|err| classify_write_error(EntityKind::Person, err))?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                kind: EntityKind::Person,
                uuid: person.uuid,
            });
        }
        Ok(())
    }

    fn find_membership(
        &self,
        person_uuid: PersonId,
        space_uuid: SpaceId,
    ) -> RepoResult<Option<Membership>> {
        query_optional(
            self.conn,
            &format!("{MEMBERSHIP_SELECT_SQL} WHERE person_uuid = ?1 AND space_uuid = ?2;"),
            params![person_uuid.to_string(), space_uuid.to_string()],
            parse_membership_row,
        )
    }

    fn create_membership(&self, membership: &Membership) -> RepoResult<()> {
        self.conn
            .execute(
                "INSERT INTO memberships (uuid, person_uuid, space_uuid, status)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    membership.uuid.to_string(),
                    membership.person_uuid.to_string(),
                    membership.space_uuid.to_string(),
                    membership.status.as_str(),
                ],
            )
            .map_err(|err| classify_write_error(EntityKind::Membership, err))?;
        Ok(())
    }

    fn list_memberships(&self, space_uuid: SpaceId) -> RepoResult<Vec<Membership>> {
        query_all(
            self.conn,
            &format!("{MEMBERSHIP_SELECT_SQL} WHERE space_uuid = ?1 ORDER BY rowid ASC;"),
            [space_uuid.to_string()],
            parse_membership_row,
        )
    }
}

fn parse_person_row(row: &Row<'_>) -> RepoResult<Person> {
    Ok(Person {
        uuid: uuid_column(row, "uuid")?,
        email: row.get("email")?,
        name: row.get("name")?,
    })
}

fn parse_membership_row(row: &Row<'_>) -> RepoResult<Membership> {
    let status_text: String = row.get("status")?;
    let status = MembershipStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid status `{status_text}` in memberships.status"
        ))
    })?;

    Ok(Membership {
        uuid: uuid_column(row, "uuid")?,
        person_uuid: uuid_column(row, "person_uuid")?,
        space_uuid: uuid_column(row, "space_uuid")?,
        status,
    })
}
