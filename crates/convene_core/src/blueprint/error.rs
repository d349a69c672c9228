//! Reconciliation error taxonomy.
//!
//! Every variant names the entity kind and natural key involved so callers
//! can tell which blueprint node aborted the pass.

use crate::model::EntityKind;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type BlueprintResult<T> = Result<T, BlueprintError>;

#[derive(Debug)]
pub enum BlueprintError {
    /// A blueprint node is missing a required field or carries an unusable value.
    Validation {
        kind: EntityKind,
        key: String,
        field: &'static str,
        message: String,
    },
    /// A blueprint node refers to something that does not exist where it must.
    Reference {
        kind: EntityKind,
        key: String,
        field: &'static str,
        target: String,
    },
    /// The natural key collides with persisted data that differs elsewhere.
    UniquenessViolation {
        kind: EntityKind,
        key: String,
        field: Option<String>,
        detail: String,
    },
    /// A step ran before the entity it depends on was resolved in this pass.
    /// The fixed traversal order makes this an internal bug.
    DependencyNotReady {
        kind: EntityKind,
        key: String,
        requires: EntityKind,
    },
    /// Storage failure unrelated to blueprint content.
    Store(RepoError),
}

impl BlueprintError {
    pub fn kind(&self) -> Option<EntityKind> {
        match self {
            Self::Validation { kind, .. }
            | Self::Reference { kind, .. }
            | Self::UniquenessViolation { kind, .. }
            | Self::DependencyNotReady { kind, .. } => Some(*kind),
            Self::Store(_) => None,
        }
    }

    /// Short stable code used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::Reference { .. } => "reference_error",
            Self::UniquenessViolation { .. } => "uniqueness_violation",
            Self::DependencyNotReady { .. } => "dependency_not_ready",
            Self::Store(_) => "store_error",
        }
    }

    pub(crate) fn validation(
        kind: EntityKind,
        key: impl Into<String>,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::Validation {
            kind,
            key: key.into(),
            field,
            message: message.into(),
        }
    }

    /// Wraps a store failure, upgrading constraint conflicts into
    /// `UniquenessViolation` for the node being written.
    pub(crate) fn from_store(kind: EntityKind, key: &str, err: RepoError) -> Self {
        match err {
            RepoError::Conflict {
                columns, detail, ..
            } => Self::UniquenessViolation {
                kind,
                key: key.to_string(),
                field: columns.last().cloned(),
                detail,
            },
            other => Self::Store(other),
        }
    }
}

impl Display for BlueprintError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation {
                kind,
                key,
                field,
                message,
            } => write!(f, "invalid {kind} `{key}`: field `{field}` {message}"),
            Self::Reference {
                kind,
                key,
                field,
                target,
            } => write!(
                f,
                "{kind} `{key}` field `{field}` references `{target}`, which does not exist"
            ),
            Self::UniquenessViolation {
                kind,
                key,
                field,
                detail,
            } => match field {
                Some(field) => write!(
                    f,
                    "{kind} `{key}` collides with existing data on `{field}`: {detail}"
                ),
                None => write!(f, "{kind} `{key}` collides with existing data: {detail}"),
            },
            Self::DependencyNotReady {
                kind,
                key,
                requires,
            } => write!(
                f,
                "{kind} `{key}` was reached before its {requires} was resolved"
            ),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for BlueprintError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for BlueprintError {
    fn from(value: RepoError) -> Self {
        Self::Store(value)
    }
}

impl From<rusqlite::Error> for BlueprintError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Store(value.into())
    }
}
