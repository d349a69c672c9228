//! Seed blueprints for demo and test environments.
//!
//! The catalog is plain data fed to [`BlueprintService`]; nothing here
//! bypasses reconciliation.

use crate::blueprint::spec::{ClientSpec, MemberSpec, RoomSpec, SpaceSpec, UtilityHookupSpec};
use crate::blueprint::{BlueprintResult, BlueprintService, Reconciliation};
use crate::model::field_map;
use crate::model::room::{AccessLevel, PublicityLevel};
use crate::model::FieldMap;
use crate::repo::people_repo::PeopleRepository;
use crate::repo::space_repo::SpaceRepository;
use log::info;
use serde_json::json;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

const ZINC_VIDEOBRIDGE_DOMAIN: &str = "convene-videobridge-zinc.zinc.coop";

/// Catalog file loading errors.
#[derive(Debug)]
pub enum CatalogError {
    Read { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: serde_json::Error },
}

impl Display for CatalogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read catalog `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "invalid catalog `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for CatalogError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
        }
    }
}

/// Reads a JSON array of client blueprints.
pub fn load_catalog(path: impl AsRef<Path>) -> Result<Vec<ClientSpec>, CatalogError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| CatalogError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CatalogError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Reconciles every blueprint in order, stopping at the first failure.
pub fn seed_catalog<S, P>(
    service: &BlueprintService<'_, S, P>,
    specs: &[ClientSpec],
) -> BlueprintResult<Vec<Reconciliation>>
where
    S: SpaceRepository,
    P: PeopleRepository,
{
    let mut reconciled = Vec::with_capacity(specs.len());
    for (index, spec) in specs.iter().enumerate() {
        let reconciliation = service.reconcile(spec)?;
        info!(
            "event=catalog_seed module=catalog status=ok index={index} space={}",
            reconciliation.space.space.uuid
        );
        reconciled.push(reconciliation);
    }
    Ok(reconciled)
}

/// Clients provisioned on every fresh environment.
pub fn builtin_catalog() -> Vec<ClientSpec> {
    vec![
        ClientSpec::new(
            "Zinc",
            SpaceSpec::named("Zinc")
                .with_branded_domain("meet.zinc.coop")
                .with_entrance("lobby")
                .with_utility_hookup(UtilityHookupSpec::new(
                    "Jitsi",
                    "jitsi",
                    field_map(json!({ "meet_domain": ZINC_VIDEOBRIDGE_DOMAIN })),
                ))
                .with_room(
                    room("Lobby", PublicityLevel::Unlisted)
                        .with_furniture("markdown_text_block", FieldMap::new()),
                )
                .with_room(
                    room("Ada", PublicityLevel::Listed)
                        .with_furniture("video_bridge", FieldMap::new()),
                )
                .with_room(
                    room("Talk to Zee", PublicityLevel::Unlisted)
                        .with_furniture("video_bridge", FieldMap::new()),
                )
                .with_member(MemberSpec::email("zee@zinc.coop"))
                .with_member(MemberSpec::email("cheryl@zinc.coop")),
        ),
        ClientSpec::new(
            "Zinc",
            SpaceSpec::named("Convene")
                .with_entrance("landing-page")
                .with_room(
                    room("Landing Page", PublicityLevel::Unlisted)
                        .with_furniture("markdown_text_block", FieldMap::new()),
                )
                .with_member(MemberSpec::email("zee@zinc.coop")),
        ),
    ]
}

/// Space layout used by end-to-end tests. It carries no name; apply it with
/// [`BlueprintService::reconcile_space`] to a space the test created.
pub fn system_test_blueprint() -> SpaceSpec {
    let video_only = |name: &str, publicity: PublicityLevel| {
        room(name, publicity).with_furniture("video_bridge", FieldMap::new())
    };

    SpaceSpec::default()
        .with_entrance("entrance-hall")
        .with_utility_hookup(UtilityHookupSpec::new(
            "Plaid",
            "plaid",
            field_map(json!({
                "client_id": "set-me",
                "secret": "and-me",
                "environment": "sandbox"
            })),
        ))
        .with_utility_hookup(UtilityHookupSpec::new(
            "Jitsi",
            "jitsi",
            field_map(json!({ "meet_domain": ZINC_VIDEOBRIDGE_DOMAIN })),
        ))
        .with_member(MemberSpec::email("space-owner@example.com"))
        .with_member(MemberSpec::email("space-member@example.com"))
        .with_room(
            room("Listed Room 1", PublicityLevel::Listed)
                .with_furniture(
                    "markdown_text_block",
                    field_map(json!({ "content": "# Welcome!" })),
                )
                .with_furniture("video_bridge", FieldMap::new())
                .with_furniture(
                    "breakout_tables_by_jitsi",
                    field_map(json!({ "names": ["engineering", "design", "ops"] })),
                ),
        )
        .with_room(video_only("Listed Room 2", PublicityLevel::Listed))
        .with_room(
            video_only("Listed Locked Room 1", PublicityLevel::Listed)
                .with_access_level(AccessLevel::Locked)
                .with_access_code("secret"),
        )
        .with_room(video_only("Unlisted Room 1", PublicityLevel::Unlisted))
        .with_room(video_only("Unlisted Room 2", PublicityLevel::Unlisted))
        .with_room(
            RoomSpec::named("Entrance Hall")
                .with_publicity_level(PublicityLevel::Unlisted)
                .with_furniture(
                    "markdown_text_block",
                    field_map(json!({ "content": "# Wooo!" })),
                )
                .with_furniture("spotlight", FieldMap::new()),
        )
}

fn room(name: &str, publicity: PublicityLevel) -> RoomSpec {
    RoomSpec::named(name)
        .with_access_level(AccessLevel::Unlocked)
        .with_publicity_level(publicity)
}

#[cfg(test)]
mod tests {
    use super::{builtin_catalog, load_catalog, system_test_blueprint, CatalogError};
    use crate::registry::{KindFamily, KindRegistry};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn builtin_catalog_only_uses_registered_kinds() {
        let registry = KindRegistry::builtin();
        let mut spaces: Vec<_> = builtin_catalog().into_iter().map(|spec| spec.space).collect();
        spaces.push(system_test_blueprint());

        for space in spaces {
            for room in &space.rooms {
                for furniture in room.furniture.iter() {
                    assert!(registry.contains(KindFamily::Furniture, &furniture.kind));
                }
            }
            for hookup in &space.utility_hookups {
                assert!(registry.contains(KindFamily::Utility, &hookup.kind));
            }
        }
    }

    #[test]
    fn load_catalog_reads_client_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.json");
        fs::write(
            &path,
            r#"[{"name": "Acme", "space": {"name": "HQ", "rooms": [{"name": "Lobby"}]}}]"#,
        )
        .unwrap();

        let specs = load_catalog(&path).unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].space.rooms[0].name, "Lobby");
    }

    #[test]
    fn load_catalog_reports_missing_and_malformed_files() {
        let dir = TempDir::new().unwrap();
        let missing = load_catalog(dir.path().join("absent.json"));
        assert!(matches!(missing, Err(CatalogError::Read { .. })));

        let path = dir.path().join("bad.json");
        fs::write(&path, r#"[{"name": "Acme", "space": {"theme": "neon"}}]"#).unwrap();
        let malformed = load_catalog(&path);
        assert!(matches!(malformed, Err(CatalogError::Parse { .. })));
    }
}
