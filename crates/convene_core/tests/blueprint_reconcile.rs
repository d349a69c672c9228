use convene_core::blueprint::{
    reconcile_atomic, BlueprintError, BlueprintService, ClientSpec, MemberSpec, RoomSpec,
    SpaceSpec, UtilityHookupSpec,
};
use convene_core::db::open_db_in_memory;
use convene_core::model::field_map;
use convene_core::model::person::MembershipStatus;
use convene_core::model::room::{AccessLevel, PublicityLevel};
use convene_core::model::space::Theme;
use convene_core::model::utility::UtilityStatus;
use convene_core::model::FieldMap;
use convene_core::repo::space_repo::{SpaceRepository, SqliteSpaceRepository};
use convene_core::{EntityKind, KindRegistry};
use rusqlite::Connection;
use serde_json::json;

fn registry() -> KindRegistry {
    let mut registry = KindRegistry::builtin();
    registry.register_furniture("markdown", &["content"]).unwrap();
    registry.register_furniture("video", &[]).unwrap();
    registry
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

fn acme_hq() -> ClientSpec {
    ClientSpec::new(
        "Acme",
        SpaceSpec::named("HQ")
            .with_entrance("Lobby")
            .with_room(
                RoomSpec::named("Lobby")
                    .with_furniture("markdown", field_map(json!({ "content": "hi" }))),
            )
            .with_room(RoomSpec::named("Ada").with_furniture("video", FieldMap::new()))
            .with_member(MemberSpec::email("a@x.com")),
    )
}

#[test]
fn acme_hq_end_to_end() {
    let conn = open_db_in_memory().unwrap();
    let registry = registry();
    let service = BlueprintService::for_connection(&conn, &registry).unwrap();

    let result = service.reconcile(&acme_hq()).unwrap();
    let graph = &result.space;

    assert_eq!(count(&conn, "clients"), 1);
    assert_eq!(count(&conn, "spaces"), 1);
    assert_eq!(graph.space.name, "HQ");
    assert_eq!(graph.entrance().unwrap().room.name, "Lobby");
    assert_eq!(graph.rooms.len(), 2);
    for entry in &graph.rooms {
        assert_eq!(entry.furniture.len(), 1);
        assert_eq!(entry.furniture[0].slot, 0);
    }
    assert_eq!(
        graph.room("Lobby").unwrap().furniture[0].settings["content"],
        json!("hi")
    );
    assert_eq!(graph.room("Ada").unwrap().furniture[0].furniture_kind, "video");
    assert_eq!(count(&conn, "people"), 1);
    assert_eq!(count(&conn, "memberships"), 1);
    assert_eq!(graph.members[0].person.email, "a@x.com");

    assert_eq!(result.changes.created(EntityKind::Client), 1);
    assert_eq!(result.changes.created(EntityKind::Room), 2);
    assert_eq!(result.changes.created(EntityKind::FurniturePlacement), 2);
    // Setting the entrance on a space created in the same pass is not an update.
    assert_eq!(result.changes.updated(EntityKind::Space), 0);
}

#[test]
fn second_identical_pass_changes_nothing() {
    let conn = open_db_in_memory().unwrap();
    let registry = registry();
    let service = BlueprintService::for_connection(&conn, &registry).unwrap();
    let spec = acme_hq()
        .space
        .with_branded_domain("meet.acme.test")
        .with_theme(Theme::DesertDunes)
        .with_utility_hookup(UtilityHookupSpec::new(
            "Jitsi",
            "jitsi",
            field_map(json!({ "meet_domain": "meet.acme.test" })),
        ));
    let spec = ClientSpec::new("Acme", spec);

    let first = service.reconcile(&spec).unwrap();
    let tables = [
        "clients",
        "spaces",
        "rooms",
        "furniture_placements",
        "utility_hookups",
        "people",
        "memberships",
    ];
    let counts_after_first: Vec<i64> = tables.iter().map(|table| count(&conn, table)).collect();

    let second = service.reconcile(&spec).unwrap();
    let counts_after_second: Vec<i64> = tables.iter().map(|table| count(&conn, table)).collect();

    assert!(second.changes.is_empty(), "unexpected changes: {}", second.changes);
    assert_eq!(counts_after_first, counts_after_second);
    assert_eq!(first.space, second.space);
}

#[test]
fn space_name_follows_blueprint_without_blanking() {
    let conn = open_db_in_memory().unwrap();
    let registry = registry();
    let service = BlueprintService::for_connection(&conn, &registry).unwrap();

    let created = service
        .reconcile(&ClientSpec::new(
            "Acme",
            SpaceSpec::named("Old").with_branded_domain("old.acme.test"),
        ))
        .unwrap();
    let space_uuid = created.space.space.uuid;

    let renamed = service
        .reconcile_space(space_uuid, &SpaceSpec::named("New"))
        .unwrap();
    assert_eq!(renamed.space.space.name, "New");
    assert_eq!(renamed.space.space.slug, "new");
    assert_eq!(
        renamed.space.space.branded_domain.as_deref(),
        Some("old.acme.test")
    );
    assert_eq!(renamed.changes.updated(EntityKind::Space), 1);

    let untouched = service
        .reconcile_space(space_uuid, &SpaceSpec::named(""))
        .unwrap();
    assert_eq!(untouched.space.space.name, "New");
    assert!(untouched.changes.is_empty());
}

#[test]
fn padded_space_name_reconciles_to_the_same_space() {
    let conn = open_db_in_memory().unwrap();
    let registry = registry();
    let service = BlueprintService::for_connection(&conn, &registry).unwrap();
    let spec = ClientSpec::new("Acme", SpaceSpec::named("HQ "));

    let first = service.reconcile(&spec).unwrap();
    assert_eq!(first.space.space.name, "HQ");

    let second = service.reconcile(&spec).unwrap();
    assert_eq!(second.space.space.uuid, first.space.space.uuid);
    assert!(second.changes.is_empty(), "unexpected changes: {}", second.changes);
    assert_eq!(count(&conn, "spaces"), 1);
}

#[test]
fn space_fields_follow_blueprint_without_blanking() {
    let conn = open_db_in_memory().unwrap();
    let registry = registry();
    let service = BlueprintService::for_connection(&conn, &registry).unwrap();

    service
        .reconcile(&ClientSpec::new(
            "Acme",
            SpaceSpec::named("HQ")
                .with_branded_domain("old.acme.test")
                .with_theme(Theme::PurpleMountains),
        ))
        .unwrap();

    let changed = service
        .reconcile(&ClientSpec::new(
            "Acme",
            SpaceSpec::named("HQ")
                .with_branded_domain("new.acme.test")
                .with_theme(Theme::DesertDunes),
        ))
        .unwrap();
    assert_eq!(
        changed.space.space.branded_domain.as_deref(),
        Some("new.acme.test")
    );
    assert_eq!(changed.space.space.theme, Some(Theme::DesertDunes));
    assert_eq!(changed.changes.updated(EntityKind::Space), 1);

    let blank_domain = ClientSpec::new("Acme", SpaceSpec::named("HQ").with_branded_domain("  "));
    let omitted = service.reconcile(&blank_domain).unwrap();
    assert_eq!(
        omitted.space.space.branded_domain.as_deref(),
        Some("new.acme.test")
    );
    assert_eq!(omitted.space.space.theme, Some(Theme::DesertDunes));
    assert!(omitted.changes.is_empty());
}

#[test]
fn room_fields_follow_blueprint_without_blanking() {
    let conn = open_db_in_memory().unwrap();
    let registry = registry();
    let service = BlueprintService::for_connection(&conn, &registry).unwrap();
    let with_room = |room: RoomSpec| {
        ClientSpec::new("Acme", SpaceSpec::named("HQ").with_room(room))
    };

    let first = service
        .reconcile(&with_room(
            RoomSpec::named("Vault")
                .with_access_level(AccessLevel::Unlocked)
                .with_publicity_level(PublicityLevel::Listed)
                .with_access_code("x"),
        ))
        .unwrap();
    let vault = &first.space.room("Vault").unwrap().room;
    assert_eq!(vault.access_level, AccessLevel::Unlocked);
    assert_eq!(vault.access_code.as_deref(), Some("x"));

    let second = service
        .reconcile(&with_room(
            RoomSpec::named("Vault")
                .with_access_level(AccessLevel::Locked)
                .with_publicity_level(PublicityLevel::Unlisted),
        ))
        .unwrap();
    let vault = &second.space.room("Vault").unwrap().room;
    assert_eq!(vault.access_level, AccessLevel::Locked);
    assert_eq!(vault.publicity_level, Some(PublicityLevel::Unlisted));
    assert_eq!(vault.access_code.as_deref(), Some("x"));
    assert_eq!(second.changes.updated(EntityKind::Room), 1);

    let third = service.reconcile(&with_room(RoomSpec::named("Vault"))).unwrap();
    let vault = &third.space.room("Vault").unwrap().room;
    assert_eq!(vault.access_level, AccessLevel::Locked);
    assert_eq!(vault.publicity_level, Some(PublicityLevel::Unlisted));
    assert_eq!(vault.access_code.as_deref(), Some("x"));
    assert!(third.changes.is_empty());
}

#[test]
fn furniture_settings_are_runtime_authoritative() {
    let conn = open_db_in_memory().unwrap();
    let registry = registry();
    let service = BlueprintService::for_connection(&conn, &registry).unwrap();
    let repo = SqliteSpaceRepository::try_new(&conn).unwrap();

    let blueprint = |content: &str| {
        ClientSpec::new(
            "Acme",
            SpaceSpec::named("HQ").with_room(
                RoomSpec::named("Lobby")
                    .with_furniture("markdown", field_map(json!({ "content": content }))),
            ),
        )
    };

    // Blank blueprint content is stored as the blank value it is.
    let first = service.reconcile(&blueprint("")).unwrap();
    let lobby = first.space.room("Lobby").unwrap();
    assert_eq!(lobby.furniture[0].settings, field_map(json!({ "content": "" })));

    // Empty persisted value: the blueprint value is applied.
    let seeded = service.reconcile(&blueprint("blueprint text")).unwrap();
    let mut placement = seeded.space.room("Lobby").unwrap().furniture[0].clone();
    assert_eq!(placement.settings["content"], json!("blueprint text"));

    // Operator customization survives later passes.
    placement.settings = field_map(json!({ "content": "user text" }));
    repo.update_furniture_placement(&placement).unwrap();

    let rerun = service.reconcile(&blueprint("blueprint text")).unwrap();
    let stored = &rerun.space.room("Lobby").unwrap().furniture[0];
    assert_eq!(stored.settings["content"], json!("user text"));
    assert!(rerun.changes.is_empty());
}

#[test]
fn removing_furniture_reassigns_slots_by_position() {
    let conn = open_db_in_memory().unwrap();
    let registry = registry();
    let service = BlueprintService::for_connection(&conn, &registry).unwrap();
    let repo = SqliteSpaceRepository::try_new(&conn).unwrap();

    let with_both = ClientSpec::new(
        "Acme",
        SpaceSpec::named("HQ").with_room(
            RoomSpec::named("Lobby")
                .with_furniture("markdown", field_map(json!({ "content": "A text" })))
                .with_furniture("video", FieldMap::new()),
        ),
    );
    let first = service.reconcile(&with_both).unwrap();
    let furniture = &first.space.room("Lobby").unwrap().furniture;
    assert_eq!(furniture[0].furniture_kind, "markdown");
    assert_eq!(furniture[1].furniture_kind, "video");

    let mut video = furniture[1].clone();
    video.settings = field_map(json!({ "room_label": "B custom" }));
    repo.update_furniture_placement(&video).unwrap();

    let only_video = ClientSpec::new(
        "Acme",
        SpaceSpec::named("HQ")
            .with_room(RoomSpec::named("Lobby").with_furniture("video", FieldMap::new())),
    );
    let second = service.reconcile(&only_video).unwrap();
    let furniture = &second.space.room("Lobby").unwrap().furniture;

    // Slot 0 is now tagged video but keeps slot 0's old settings; the video
    // customization stays behind on slot 1, which is never deleted.
    assert_eq!(furniture.len(), 2);
    assert_eq!(furniture[0].furniture_kind, "video");
    assert_eq!(furniture[0].settings["content"], json!("A text"));
    assert!(!furniture[0].settings.contains_key("room_label"));
    assert_eq!(furniture[1].settings["room_label"], json!("B custom"));
    assert_eq!(second.changes.updated(EntityKind::FurniturePlacement), 1);
}

#[test]
fn missing_entrance_fails_after_rooms_and_keeps_earlier_writes() {
    let conn = open_db_in_memory().unwrap();
    let registry = registry();
    let service = BlueprintService::for_connection(&conn, &registry).unwrap();

    let spec = ClientSpec::new(
        "Acme",
        SpaceSpec::named("HQ")
            .with_entrance("Atrium")
            .with_room(RoomSpec::named("Lobby"))
            .with_utility_hookup(UtilityHookupSpec::new("Jitsi", "jitsi", FieldMap::new()))
            .with_member(MemberSpec::email("a@x.com")),
    );

    let err = service.reconcile(&spec).unwrap_err();
    match err {
        BlueprintError::Reference {
            kind,
            key,
            field,
            target,
        } => {
            assert_eq!(kind, EntityKind::Space);
            assert_eq!(key, "HQ");
            assert_eq!(field, "entrance");
            assert_eq!(target, "Atrium");
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(count(&conn, "clients"), 1);
    assert_eq!(count(&conn, "spaces"), 1);
    assert_eq!(count(&conn, "rooms"), 1);
    assert_eq!(count(&conn, "utility_hookups"), 1);
    assert_eq!(count(&conn, "people"), 0);
    assert_eq!(count(&conn, "memberships"), 0);
}

#[test]
fn entrance_may_be_addressed_by_slug() {
    let conn = open_db_in_memory().unwrap();
    let registry = registry();
    let service = BlueprintService::for_connection(&conn, &registry).unwrap();

    let result = service
        .reconcile(&ClientSpec::new(
            "Zinc",
            SpaceSpec::named("Convene")
                .with_entrance("landing-page")
                .with_room(RoomSpec::named("Landing Page")),
        ))
        .unwrap();
    assert_eq!(result.space.entrance().unwrap().room.name, "Landing Page");
}

#[test]
fn atomic_pass_rolls_back_everything_on_error() {
    let mut conn = open_db_in_memory().unwrap();
    let registry = registry();
    let spec = ClientSpec::new(
        "Acme",
        SpaceSpec::named("HQ")
            .with_entrance("Atrium")
            .with_room(RoomSpec::named("Lobby")),
    );

    let err = reconcile_atomic(&mut conn, &registry, &spec).unwrap_err();
    assert!(matches!(err, BlueprintError::Reference { .. }));
    assert_eq!(count(&conn, "clients"), 0);
    assert_eq!(count(&conn, "spaces"), 0);
    assert_eq!(count(&conn, "rooms"), 0);

    let ok = reconcile_atomic(&mut conn, &registry, &acme_hq()).unwrap();
    assert_eq!(ok.space.rooms.len(), 2);
    assert_eq!(count(&conn, "rooms"), 2);
}

#[test]
fn repeated_member_email_yields_one_person_and_membership() {
    let conn = open_db_in_memory().unwrap();
    let registry = registry();
    let service = BlueprintService::for_connection(&conn, &registry).unwrap();

    let spec = ClientSpec::new(
        "Acme",
        SpaceSpec::named("HQ")
            .with_member(MemberSpec::email("a@x.com"))
            .with_member(MemberSpec::email("  A@X.com ")),
    );
    let first = service.reconcile(&spec).unwrap();
    assert_eq!(first.changes.created(EntityKind::Person), 1);
    assert_eq!(first.changes.created(EntityKind::Membership), 1);

    service.reconcile(&spec).unwrap();
    assert_eq!(count(&conn, "people"), 1);
    assert_eq!(count(&conn, "memberships"), 1);
}

#[test]
fn existing_person_reference_joins_without_lookup_by_email() {
    let conn = open_db_in_memory().unwrap();
    let registry = registry();
    let service = BlueprintService::for_connection(&conn, &registry).unwrap();

    let first = service.reconcile(&acme_hq()).unwrap();
    let person_uuid = first.space.members[0].person.uuid;

    let annex = service
        .reconcile(&ClientSpec::new(
            "Acme",
            SpaceSpec::named("Annex").with_member(MemberSpec::existing(person_uuid)),
        ))
        .unwrap();
    assert_eq!(annex.space.members.len(), 1);
    assert_eq!(annex.space.members[0].person.uuid, person_uuid);
    assert_eq!(count(&conn, "people"), 1);
    assert_eq!(count(&conn, "memberships"), 2);

    let missing = uuid::Uuid::new_v4();
    let err = service
        .reconcile(&ClientSpec::new(
            "Acme",
            SpaceSpec::named("Annex").with_member(MemberSpec::existing(missing)),
        ))
        .unwrap_err();
    assert!(matches!(
        err,
        BlueprintError::Reference {
            field: "person_id",
            ..
        }
    ));
}

#[test]
fn member_profile_name_follows_blueprint() {
    let conn = open_db_in_memory().unwrap();
    let registry = registry();
    let service = BlueprintService::for_connection(&conn, &registry).unwrap();

    let with_name = |name: Option<&str>| {
        let member: MemberSpec = serde_json::from_value(json!({
            "email": "zee@zinc.coop",
            "name": name
        }))
        .unwrap();
        ClientSpec::new("Zinc", SpaceSpec::named("Zinc").with_member(member))
    };

    service.reconcile(&with_name(Some("Zee"))).unwrap();
    let renamed = service.reconcile(&with_name(Some("Zee Z."))).unwrap();
    assert_eq!(renamed.space.members[0].person.name.as_deref(), Some("Zee Z."));
    assert_eq!(renamed.changes.updated(EntityKind::Person), 1);

    let omitted = service.reconcile(&with_name(None)).unwrap();
    assert_eq!(omitted.space.members[0].person.name.as_deref(), Some("Zee Z."));
    assert!(omitted.changes.is_empty());
}

#[test]
fn runtime_owned_statuses_survive_reconciliation() {
    let conn = open_db_in_memory().unwrap();
    let registry = registry();
    let service = BlueprintService::for_connection(&conn, &registry).unwrap();

    let spec = |config: serde_json::Value| {
        ClientSpec::new(
            "Acme",
            SpaceSpec::named("HQ")
                .with_utility_hookup(UtilityHookupSpec::new("Plaid", "plaid", field_map(config)))
                .with_member(MemberSpec::email("a@x.com")),
        )
    };

    service
        .reconcile(&spec(json!({ "client_id": "set-me", "secret": "" })))
        .unwrap();
    conn.execute_batch(
        "UPDATE utility_hookups SET status = 'ready',
            configuration = '{\"client_id\":\"live-id\",\"secret\":\"\"}';
         UPDATE memberships SET status = 'revoked';",
    )
    .unwrap();

    let rerun = service
        .reconcile(&spec(json!({
            "client_id": "set-me",
            "secret": "and-me",
            "environment": "sandbox"
        })))
        .unwrap();

    let plaid = rerun.space.utility_hookup("Plaid").unwrap();
    assert_eq!(plaid.status, UtilityStatus::Ready);
    assert_eq!(plaid.configuration["client_id"], json!("live-id"));
    assert_eq!(plaid.configuration["secret"], json!("and-me"));
    assert_eq!(plaid.configuration["environment"], json!("sandbox"));
    assert_eq!(
        rerun.space.members[0].membership.status,
        MembershipStatus::Revoked
    );
    assert_eq!(rerun.changes.updated(EntityKind::UtilityHookup), 1);
    assert_eq!(rerun.changes.created(EntityKind::Membership), 0);
}

#[test]
fn space_owned_by_another_client_is_a_uniqueness_violation() {
    let conn = open_db_in_memory().unwrap();
    let registry = registry();
    let service = BlueprintService::for_connection(&conn, &registry).unwrap();

    service.reconcile(&acme_hq()).unwrap();
    let err = service
        .reconcile(&ClientSpec::new("Globex", SpaceSpec::named("HQ")))
        .unwrap_err();

    match err {
        BlueprintError::UniquenessViolation {
            kind, key, field, ..
        } => {
            assert_eq!(kind, EntityKind::Space);
            assert_eq!(key, "HQ");
            assert_eq!(field.as_deref(), Some("client"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn colliding_room_slugs_surface_as_uniqueness_violation() {
    let conn = open_db_in_memory().unwrap();
    let registry = registry();
    let service = BlueprintService::for_connection(&conn, &registry).unwrap();

    let err = service
        .reconcile(&ClientSpec::new(
            "Acme",
            SpaceSpec::named("HQ")
                .with_room(RoomSpec::named("Lobby"))
                .with_room(RoomSpec::named("lobby!")),
        ))
        .unwrap_err();

    match err {
        BlueprintError::UniquenessViolation {
            kind, key, field, ..
        } => {
            assert_eq!(kind, EntityKind::Room);
            assert_eq!(key, "lobby!");
            assert_eq!(field.as_deref(), Some("slug"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn invalid_nodes_are_validation_errors_with_context() {
    let conn = open_db_in_memory().unwrap();
    let registry = registry();
    let service = BlueprintService::for_connection(&conn, &registry).unwrap();

    let unnamed_room = service
        .reconcile(&ClientSpec::new(
            "Acme",
            SpaceSpec::named("HQ")
                .with_room(RoomSpec::named("Lobby"))
                .with_room(RoomSpec::named("  ")),
        ))
        .unwrap_err();
    match unnamed_room {
        BlueprintError::Validation {
            kind, key, field, ..
        } => {
            assert_eq!(kind, EntityKind::Room);
            assert_eq!(key, "rooms[1]");
            assert_eq!(field, "name");
        }
        other => panic!("unexpected error: {other}"),
    }

    let unknown_kind = service
        .reconcile(&ClientSpec::new(
            "Acme",
            SpaceSpec::named("HQ").with_room(
                RoomSpec::named("Lobby")
                    .with_furniture("video", FieldMap::new())
                    .with_furniture("hologram", FieldMap::new()),
            ),
        ))
        .unwrap_err();
    match unknown_kind {
        BlueprintError::Validation {
            kind, key, field, ..
        } => {
            assert_eq!(kind, EntityKind::FurniturePlacement);
            assert_eq!(key, "Lobby#1");
            assert_eq!(field, "kind");
        }
        other => panic!("unexpected error: {other}"),
    }

    let bad_email = service
        .reconcile(&ClientSpec::new(
            "Acme",
            SpaceSpec::named("HQ").with_member(MemberSpec::email("not-an-email")),
        ))
        .unwrap_err();
    assert!(matches!(
        bad_email,
        BlueprintError::Validation {
            kind: EntityKind::Person,
            field: "email",
            ..
        }
    ));

    let blank_client = service
        .reconcile(&ClientSpec::new(" ", SpaceSpec::named("HQ")))
        .unwrap_err();
    assert!(matches!(
        blank_client,
        BlueprintError::Validation {
            kind: EntityKind::Client,
            ..
        }
    ));
}

#[test]
fn reconcile_space_reports_unknown_space() {
    let conn = open_db_in_memory().unwrap();
    let registry = registry();
    let service = BlueprintService::for_connection(&conn, &registry).unwrap();

    let err = service
        .reconcile_space(uuid::Uuid::new_v4(), &SpaceSpec::named("HQ"))
        .unwrap_err();
    assert!(matches!(err, BlueprintError::Store(_)));
}
