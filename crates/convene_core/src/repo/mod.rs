//! Persistent store contracts and SQLite implementations.
//!
//! # Responsibility
//! - Expose natural-key lookup, create and update per entity kind.
//! - Translate storage constraint failures into semantic repository errors.
//!
//! # Invariants
//! - Repositories only operate on connections migrated to the latest schema.
//! - Unique-constraint failures surface as `RepoError::Conflict`, never as a
//!   silent overwrite.

pub mod people_repo;
pub mod space_repo;

use crate::db::migrations::{current_version, latest_version};
use crate::db::DbError;
use crate::model::{EntityKind, FieldMap};
use rusqlite::{ffi, Connection, Params, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from persistent store operations.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Update target does not exist.
    NotFound { kind: EntityKind, uuid: Uuid },
    /// A unique constraint rejected the write.
    Conflict {
        kind: EntityKind,
        /// Constrained columns as reported by SQLite, without table prefix.
        columns: Vec<String>,
        detail: String,
    },
    /// A foreign key rejected the write.
    BrokenReference { kind: EntityKind, detail: String },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Persisted data cannot be converted to a valid record.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { kind, uuid } => write!(f, "{kind} not found: {uuid}"),
            Self::Conflict { kind, detail, .. } => {
                write!(f, "{kind} conflicts with persisted data: {detail}")
            }
            Self::BrokenReference { kind, detail } => {
                write!(f, "{kind} references missing data: {detail}")
            }
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Maps a failed INSERT/UPDATE into `Conflict`/`BrokenReference` when SQLite
/// reports a constraint, otherwise into `Db`.
pub(crate) fn classify_write_error(kind: EntityKind, err: rusqlite::Error) -> RepoError {
    let (extended_code, detail) = match &err {
        rusqlite::Error::SqliteFailure(inner, message) => (
            inner.extended_code,
            message.clone().unwrap_or_else(|| inner.to_string()),
        ),
        _ => return err.into(),
    };

    match extended_code {
        ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => RepoError::Conflict {
            kind,
            columns: constrained_columns(&detail),
            detail,
        },
        ffi::SQLITE_CONSTRAINT_FOREIGNKEY => RepoError::BrokenReference { kind, detail },
        _ => err.into(),
    }
}

// "UNIQUE constraint failed: rooms.space_uuid, rooms.slug" -> ["space_uuid", "slug"]
fn constrained_columns(detail: &str) -> Vec<String> {
    let Some((_, columns)) = detail.split_once("failed:") else {
        return Vec::new();
    };
    columns
        .split(',')
        .map(|column| {
            let column = column.trim();
            column
                .rsplit_once('.')
                .map_or(column, |(_, name)| name)
                .to_string()
        })
        .filter(|column| !column.is_empty())
        .collect()
}

pub(crate) fn query_optional<T, P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
    parse: fn(&Row<'_>) -> RepoResult<T>,
) -> RepoResult<Option<T>> {
    let mut stmt = conn.prepare_cached(sql)?;
    let mut rows = stmt.query(params)?;
    match rows.next()? {
        Some(row) => Ok(Some(parse(row)?)),
        None => Ok(None),
    }
}

pub(crate) fn query_all<T, P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
    parse: fn(&Row<'_>) -> RepoResult<T>,
) -> RepoResult<Vec<T>> {
    let mut stmt = conn.prepare_cached(sql)?;
    let mut rows = stmt.query(params)?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(parse(row)?);
    }
    Ok(items)
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

pub(crate) fn uuid_column(row: &Row<'_>, column: &'static str) -> RepoResult<Uuid> {
    let text: String = row.get(column)?;
    parse_uuid(&text, column)
}

pub(crate) fn optional_uuid_column(row: &Row<'_>, column: &'static str) -> RepoResult<Option<Uuid>> {
    row.get::<_, Option<String>>(column)?
        .map(|value| parse_uuid(&value, column))
        .transpose()
}

pub(crate) fn encode_fields(fields: &FieldMap) -> RepoResult<String> {
    serde_json::to_string(fields)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode field map: {err}")))
}

pub(crate) fn fields_column(row: &Row<'_>, column: &'static str) -> RepoResult<FieldMap> {
    let text: String = row.get(column)?;
    serde_json::from_str(&text)
        .map_err(|err| RepoError::InvalidData(format!("invalid JSON object in {column}: {err}")))
}

/// Fails unless `conn` is at the latest schema version and has every table in
/// `tables`.
pub(crate) fn ensure_connection_ready(
    conn: &Connection,
    tables: &[&'static str],
) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &table in tables {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }
    Ok(())
}
