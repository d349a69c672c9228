//! Blueprint reconciliation: converge persisted spaces toward a declarative
//! client blueprint.
//!
//! # Responsibility
//! - Walk one `ClientSpec` in a fixed order: client, space, rooms (with their
//!   furniture), utility hookups, entrance, members.
//! - Resolve every node by natural key, merge it under the kind's declared
//!   direction, and write only what changed.
//!
//! # Invariants
//! - A second pass with an identical blueprint creates and updates nothing.
//! - Nothing is ever deleted; entities absent from a later blueprint stay.
//! - The first error aborts the pass. Earlier writes stay persisted unless the
//!   caller uses [`reconcile_atomic`].
//! - Utility configuration values are never logged.

pub mod error;
pub mod graph;
pub mod policy;
pub mod report;
pub mod resolver;
pub mod spec;

pub use error::{BlueprintError, BlueprintResult};
pub use graph::{FurnishedRoom, Member, SpaceGraph};
pub use policy::{is_blank, merge_direction, merge_fields, MergeDirection, Reconcile};
pub use report::ChangeSet;
pub use spec::{
    ClientSpec, FurnitureLayout, FurnitureSpec, MemberProfile, MemberSpec, RoomSpec, SpaceSpec,
    UtilityHookupSpec,
};

use crate::model::person::Person;
use crate::model::room::Room;
use crate::model::space::{Client, Space, SpaceId};
use crate::model::EntityKind;
use crate::registry::KindRegistry;
use crate::repo::people_repo::{PeopleRepository, SqlitePeopleRepository};
use crate::repo::space_repo::{SpaceRepository, SqliteSpaceRepository};
use crate::repo::RepoResult;
use graph::load_graph;
use log::{debug, error, info};
use resolver::{
    resolve_client, resolve_entrance, resolve_furniture_placement, resolve_membership,
    resolve_person, resolve_person_by_id, resolve_room, resolve_space, resolve_space_by_id,
    resolve_utility_hookup, room_key, Resolved,
};
use rusqlite::{Connection, TransactionBehavior};
use std::time::Instant;

/// Result of one successful pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub space: SpaceGraph,
    pub changes: ChangeSet,
}

/// Orchestrates reconciliation passes over injected repositories.
pub struct BlueprintService<'r, S: SpaceRepository, P: PeopleRepository> {
    spaces: S,
    people: P,
    registry: &'r KindRegistry,
}

impl<'r, 'conn> BlueprintService<'r, SqliteSpaceRepository<'conn>, SqlitePeopleRepository<'conn>> {
    /// Builds a service backed by one migrated SQLite connection.
    pub fn for_connection(conn: &'conn Connection, registry: &'r KindRegistry) -> RepoResult<Self> {
        Ok(Self::new(
            SqliteSpaceRepository::try_new(conn)?,
            SqlitePeopleRepository::try_new(conn)?,
            registry,
        ))
    }
}

impl<'r, S: SpaceRepository, P: PeopleRepository> BlueprintService<'r, S, P> {
    pub fn new(spaces: S, people: P, registry: &'r KindRegistry) -> Self {
        Self {
            spaces,
            people,
            registry,
        }
    }

    pub fn registry(&self) -> &KindRegistry {
        self.registry
    }

    /// Runs one full pass, resolving client and space by name.
    pub fn reconcile(&self, spec: &ClientSpec) -> BlueprintResult<Reconciliation> {
        self.run("by_name", &spec.space, |pass| {
            self.apply_client(pass, &spec.name)?;
            self.apply_space(pass, &spec.space)?;
            self.apply_contents(pass, &spec.space)
        })
    }

    /// Runs one pass against a space the caller already holds.
    ///
    /// The client step is skipped. A non-blank blueprint name renames the
    /// space; a blank one leaves it.
    pub fn reconcile_space(
        &self,
        space_uuid: SpaceId,
        spec: &SpaceSpec,
    ) -> BlueprintResult<Reconciliation> {
        self.run("by_id", spec, |pass| {
            let resolved = resolve_space_by_id(&self.spaces, space_uuid, &spec.name)?;
            self.persist_space(pass, resolved, spec)?;
            self.apply_contents(pass, spec)
        })
    }

    /// Reads back one space with everything it owns.
    pub fn load_space(&self, space_uuid: SpaceId) -> BlueprintResult<SpaceGraph> {
        Ok(load_graph(&self.spaces, &self.people, space_uuid)?)
    }

    fn run(
        &self,
        mode: &'static str,
        spec: &SpaceSpec,
        steps: impl FnOnce(&mut Pass) -> BlueprintResult<()>,
    ) -> BlueprintResult<Reconciliation> {
        let started_at = Instant::now();
        info!(
            "event=reconcile module=blueprint status=start mode={mode} rooms={} utility_hookups={} members={}",
            spec.rooms.len(),
            spec.utility_hookups.len(),
            spec.members.len()
        );

        let mut pass = Pass::default();
        let outcome = steps(&mut pass).and_then(|()| {
            let space = pass.require_space(EntityKind::Space, &spec.name)?;
            load_graph(&self.spaces, &self.people, space.uuid).map_err(BlueprintError::from)
        });

        match outcome {
            Ok(graph) => {
                info!(
                    "event=reconcile module=blueprint status=ok mode={mode} space={} created={} updated={} duration_ms={}",
                    graph.space.uuid,
                    pass.changes.total_created(),
                    pass.changes.total_updated(),
                    started_at.elapsed().as_millis()
                );
                Ok(Reconciliation {
                    space: graph,
                    changes: pass.changes,
                })
            }
            Err(err) => {
                error!(
                    "event=reconcile module=blueprint status=error mode={mode} duration_ms={} error_code={} applied=\"{}\" error={err}",
                    started_at.elapsed().as_millis(),
                    err.code(),
                    pass.changes
                );
                Err(err)
            }
        }
    }

    fn apply_client(&self, pass: &mut Pass, name: &str) -> BlueprintResult<()> {
        let resolved = resolve_client(&self.spaces, name)?;
        if resolved.is_new {
            self.spaces
                .create_client(&resolved.entity)
                .map_err(|err| BlueprintError::from_store(EntityKind::Client, name, err))?;
            record_created(pass, EntityKind::Client);
        }
        pass.client = Some(resolved.entity);
        Ok(())
    }

    fn apply_space(&self, pass: &mut Pass, spec: &SpaceSpec) -> BlueprintResult<()> {
        let client = pass.require_client(EntityKind::Space, &spec.name)?;
        let resolved = resolve_space(&self.spaces, client, &spec.name)?;
        self.persist_space(pass, resolved, spec)
    }

    fn persist_space(
        &self,
        pass: &mut Pass,
        resolved: Resolved<Space>,
        spec: &SpaceSpec,
    ) -> BlueprintResult<()> {
        let key = resolved.entity.name.clone();
        let merged = resolved.entity.merged_with(spec);
        let space = persist(
            pass,
            EntityKind::Space,
            &key,
            resolved,
            merged,
            |space| self.spaces.create_space(space),
            |space| self.spaces.update_space(space),
        )?;
        pass.space = Some(space);
        Ok(())
    }

    fn apply_contents(&self, pass: &mut Pass, spec: &SpaceSpec) -> BlueprintResult<()> {
        let space = pass.require_space(EntityKind::Room, &spec.name)?.clone();

        for (position, room) in spec.rooms.iter().enumerate() {
            self.apply_room(pass, &space, position, room)?;
        }
        pass.rooms_resolved = true;

        for (position, hookup) in spec.utility_hookups.iter().enumerate() {
            self.apply_utility_hookup(pass, &space, position, hookup)?;
        }

        if let Some(reference) = spec.entrance.as_deref() {
            if !reference.trim().is_empty() {
                self.apply_entrance(pass, reference)?;
            }
        }

        for member in &spec.members {
            self.apply_member(pass, &space, member)?;
        }
        Ok(())
    }

    fn apply_room(
        &self,
        pass: &mut Pass,
        space: &Space,
        position: usize,
        spec: &RoomSpec,
    ) -> BlueprintResult<()> {
        let resolved = resolve_room(&self.spaces, space, position, spec)?;
        let merged = resolved.entity.merged_with(spec);
        let room = persist(
            pass,
            EntityKind::Room,
            &room_key(position, spec),
            resolved,
            merged,
            |room| self.spaces.create_room(room),
            |room| self.spaces.update_room(room),
        )?;

        for (slot, furniture) in spec.furniture.iter().enumerate() {
            self.apply_furniture(pass, &room, slot, furniture)?;
        }
        Ok(())
    }

    fn apply_furniture(
        &self,
        pass: &mut Pass,
        room: &Room,
        slot: usize,
        spec: &FurnitureSpec,
    ) -> BlueprintResult<()> {
        let resolved = resolve_furniture_placement(&self.spaces, self.registry, room, slot, spec)?;
        let merged = resolved.entity.merged_with(spec);
        persist(
            pass,
            EntityKind::FurniturePlacement,
            &format!("{}#{slot}", room.name),
            resolved,
            merged,
            |placement| self.spaces.create_furniture_placement(placement),
            |placement| self.spaces.update_furniture_placement(placement),
        )?;
        Ok(())
    }

    fn apply_utility_hookup(
        &self,
        pass: &mut Pass,
        space: &Space,
        position: usize,
        spec: &UtilityHookupSpec,
    ) -> BlueprintResult<()> {
        let resolved = resolve_utility_hookup(&self.spaces, self.registry, space, position, spec)?;
        let key = resolved.entity.name.clone();
        let merged = resolved.entity.merged_with(spec);
        persist(
            pass,
            EntityKind::UtilityHookup,
            &key,
            resolved,
            merged,
            |hookup| self.spaces.create_utility_hookup(hookup),
            |hookup| self.spaces.update_utility_hookup(hookup),
        )?;
        Ok(())
    }

    fn apply_entrance(&self, pass: &mut Pass, reference: &str) -> BlueprintResult<()> {
        if !pass.rooms_resolved {
            return Err(BlueprintError::DependencyNotReady {
                kind: EntityKind::Space,
                key: reference.to_string(),
                requires: EntityKind::Room,
            });
        }
        let space = pass.require_space(EntityKind::Space, reference)?;
        let room = resolve_entrance(&self.spaces, space, reference)?;
        if space.entrance_uuid == Some(room.uuid) {
            return Ok(());
        }

        let mut updated = space.clone();
        updated.entrance_uuid = Some(room.uuid);
        self.spaces
            .update_space(&updated)
            .map_err(|err| BlueprintError::from_store(EntityKind::Space, &updated.name, err))?;
        // The space is one entity per pass; count it once however many
        // steps touch it.
        if pass.changes.created(EntityKind::Space) == 0
            && pass.changes.updated(EntityKind::Space) == 0
        {
            record_updated(pass, EntityKind::Space);
        }
        pass.space = Some(updated);
        Ok(())
    }

    fn apply_member(&self, pass: &mut Pass, space: &Space, spec: &MemberSpec) -> BlueprintResult<()> {
        let person = match spec {
            MemberSpec::Existing { person_id } => resolve_person_by_id(&self.people, *person_id)?,
            MemberSpec::Profile(profile) => self.apply_person(pass, profile)?,
        };

        let resolved = resolve_membership(&self.people, &person, space)?;
        if resolved.is_new {
            self.people
                .create_membership(&resolved.entity)
                .map_err(|err| {
                    BlueprintError::from_store(EntityKind::Membership, &person.email, err)
                })?;
            record_created(pass, EntityKind::Membership);
        }
        Ok(())
    }

    fn apply_person(&self, pass: &mut Pass, profile: &MemberProfile) -> BlueprintResult<Person> {
        let resolved = resolve_person(&self.people, profile)?;
        let key = resolved.entity.email.clone();
        let merged = resolved.entity.merged_with(profile);
        persist(
            pass,
            EntityKind::Person,
            &key,
            resolved,
            merged,
            |person| self.people.create_person(person),
            |person| self.people.update_person(person),
        )
    }
}

/// Runs one pass inside a single `IMMEDIATE` transaction.
///
/// Any error rolls back every write of the pass.
pub fn reconcile_atomic(
    conn: &mut Connection,
    registry: &KindRegistry,
    spec: &ClientSpec,
) -> BlueprintResult<Reconciliation> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let outcome = BlueprintService::for_connection(&tx, registry)
        .map_err(BlueprintError::from)
        .and_then(|service| service.reconcile(spec));

    match outcome {
        Ok(reconciliation) => {
            tx.commit()?;
            Ok(reconciliation)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback() {
                error!(
                    "event=reconcile_atomic module=blueprint status=error error_code=rollback_failed error={rollback_err}"
                );
            } else {
                info!(
                    "event=reconcile_atomic module=blueprint status=rolled_back error_code={}",
                    err.code()
                );
            }
            Err(err)
        }
    }
}

/// Entities resolved so far in the current pass.
#[derive(Default)]
struct Pass {
    client: Option<Client>,
    space: Option<Space>,
    rooms_resolved: bool,
    changes: ChangeSet,
}

impl Pass {
    fn require_client(&self, kind: EntityKind, key: &str) -> BlueprintResult<&Client> {
        self.client
            .as_ref()
            .ok_or_else(|| BlueprintError::DependencyNotReady {
                kind,
                key: key.to_string(),
                requires: EntityKind::Client,
            })
    }

    fn require_space(&self, kind: EntityKind, key: &str) -> BlueprintResult<&Space> {
        self.space
            .as_ref()
            .ok_or_else(|| BlueprintError::DependencyNotReady {
                kind,
                key: key.to_string(),
                requires: EntityKind::Space,
            })
    }
}

/// Creates a new entity or updates a persisted one whose merge changed it.
fn persist<T: PartialEq>(
    pass: &mut Pass,
    kind: EntityKind,
    key: &str,
    resolved: Resolved<T>,
    merged: T,
    create: impl FnOnce(&T) -> RepoResult<()>,
    update: impl FnOnce(&T) -> RepoResult<()>,
) -> BlueprintResult<T> {
    if resolved.is_new {
        create(&merged).map_err(|err| BlueprintError::from_store(kind, key, err))?;
        record_created(pass, kind);
    } else if merged != resolved.entity {
        update(&merged).map_err(|err| BlueprintError::from_store(kind, key, err))?;
        record_updated(pass, kind);
    }
    Ok(merged)
}

fn record_created(pass: &mut Pass, kind: EntityKind) {
    pass.changes.record_created(kind);
    debug!("event=entity_write module=blueprint status=created kind={kind}");
}

fn record_updated(pass: &mut Pass, kind: EntityKind) {
    pass.changes.record_updated(kind);
    debug!("event=entity_write module=blueprint status=updated kind={kind}");
}
