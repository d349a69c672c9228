//! Core provisioning engine for Convene spaces.
//! Reconciles declarative client blueprints into persisted spaces.

pub mod blueprint;
pub mod catalog;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod registry;
pub mod repo;
pub mod summary;

pub use blueprint::{
    reconcile_atomic, BlueprintError, BlueprintResult, BlueprintService, ChangeSet, ClientSpec,
    MemberSpec, Reconciliation, RoomSpec, SpaceGraph, SpaceSpec, UtilityHookupSpec,
};
pub use catalog::{builtin_catalog, load_catalog, seed_catalog, system_test_blueprint, CatalogError};
pub use config::{ConfigError, SeedConfig};
pub use db::{open_db, open_db_in_memory, DbError};
pub use logging::{default_log_level, init_logging, logging_status, LogConfig, LoggingError};
pub use model::EntityKind;
pub use registry::{KindFamily, KindRegistry, RegistryError};
pub use repo::{RepoError, RepoResult};
pub use summary::SpaceSummary;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
