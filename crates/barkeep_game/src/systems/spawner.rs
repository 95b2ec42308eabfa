//! Timed spawning while the bar is open.

use barkeep_ecs::{Entity, OnceSystem};
use barkeep_math::{Transform, Vec2};
use tracing::debug;

use crate::components::{IsSpawner, SpawnKind};
use crate::makers::{make_customer, make_trash};
use crate::query::{GameQueryExt, query};
use crate::world::GameWorld;

/// Maker for each spawn kind.
fn spawn(entity: &mut Entity, kind: SpawnKind, pos: Vec2) {
    match kind {
        SpawnKind::Customer => make_customer(entity, pos),
        SpawnKind::Trash => make_trash(entity, pos),
    }
}

/// Advances every spawner and spawns at its position when due.
///
/// Spawners with duplicate prevention wait while anything else occupies
/// their cell; the countdown stays expired so they spawn as soon as the
/// cell clears.
#[derive(Debug, Default)]
pub struct ProcessSpawners;

impl OnceSystem<GameWorld> for ProcessSpawners {
    fn name(&self) -> &'static str {
        "process_spawners"
    }

    fn should_run(&self, world: &GameWorld, _dt: f32) -> bool {
        world.is_bar_open()
    }

    fn once(&mut self, world: &mut GameWorld, dt: f32) {
        let spawners = query(&world.entities)
            .where_has::<IsSpawner>()
            .where_has::<Transform>()
            .gen_ids();
        for id in spawners {
            let Some(entity) = world.entities.get_by_id_mut(id) else {
                continue;
            };
            let pos = entity.get::<Transform>().as2();
            let spawner = entity.get_mut::<IsSpawner>();
            if !spawner.pass_time(dt) {
                continue;
            }
            let kind = spawner.kind();
            let prevent_dupes = spawner.prevent_dupes();
            if prevent_dupes
                && query(&world.entities)
                    .where_not_id(id)
                    .where_snapped_position_matches(pos)
                    .has_values()
            {
                debug!(spawner = %id, "spawn point occupied");
                if let Some(spawner) = world
                    .entities
                    .get_by_id_mut(id)
                    .and_then(|e| e.try_get_mut::<IsSpawner>())
                {
                    spawner.hold();
                }
                continue;
            }
            let spawned = world.entities.create();
            spawn(spawned, kind, pos);
            debug!(spawner = %id, entity = %spawned.id, ?kind, "spawned");
            world.entities.get_enforced_mut(id).get_mut::<IsSpawner>().post_spawn_reset();
        }
    }
}
