//! Seeding configuration resolved from the environment.
//!
//! Every variable is optional. Blank values count as unset.

use crate::logging::{default_log_level, LogConfig};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const DB_PATH_VAR: &str = "CONVENE_DB_PATH";
pub const LOG_LEVEL_VAR: &str = "CONVENE_LOG_LEVEL";
pub const LOG_DIR_VAR: &str = "CONVENE_LOG_DIR";
pub const CATALOG_VAR: &str = "CONVENE_CATALOG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set to a value that cannot be used.
    InvalidValue {
        variable: &'static str,
        value: String,
        reason: &'static str,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue {
                variable,
                value,
                reason,
            } => write!(f, "{variable}=`{value}` is invalid: {reason}"),
        }
    }
}

impl Error for ConfigError {}

/// Inputs of one seeding run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedConfig {
    /// `None` seeds a throwaway in-memory database.
    pub db_path: Option<PathBuf>,
    /// `None` seeds the built-in catalog.
    pub catalog_path: Option<PathBuf>,
    pub log: LogConfig,
}

impl SeedConfig {
    /// Reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolves configuration through `lookup`, which returns a variable's
    /// raw value when set.
    pub fn from_lookup<F>(mut lookup: F) -> Result<Self, ConfigError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut read = |name: &str| {
            lookup(name)
                .map(|raw| raw.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let log_dir = match read(LOG_DIR_VAR) {
            Some(value) => {
                let path = PathBuf::from(&value);
                if !path.is_absolute() {
                    return Err(ConfigError::InvalidValue {
                        variable: LOG_DIR_VAR,
                        value,
                        reason: "log directory must be an absolute path",
                    });
                }
                Some(path)
            }
            None => None,
        };

        Ok(Self {
            db_path: read(DB_PATH_VAR).map(PathBuf::from),
            catalog_path: read(CATALOG_VAR).map(PathBuf::from),
            log: LogConfig {
                level: read(LOG_LEVEL_VAR).unwrap_or_else(|| default_log_level().to_string()),
                log_dir,
            },
        })
    }
}
