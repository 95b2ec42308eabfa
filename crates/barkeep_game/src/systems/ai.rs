//! Customer AI.
//!
//! Each customer runs a small state machine ([`AiState`]). Systems stage
//! transitions with [`IsAiControlled::set_next_state`] and
//! [`AiCommitNextState`] applies them at the start of the next tick, so
//! every AI system in one tick sees a consistent state.
//!
//! ```text
//! Wander --(bar opens)--> QueueForRegister --(front of line)--> AtRegisterWaitForDrink
//!                                                                      |
//!   (day starts, from any state) ---> Leave <-----(paid for drink)-----+
//! ```

use barkeep_ecs::{
    Commands, EntityId, EntityMeta, EntityStore, EntitySystem, NamedEntity, OnceSystem,
};
use barkeep_math::{Transform, Vec2, to_cell};
use tracing::debug;

use crate::components::holding::drop_item;
use crate::components::{
    AiState, AiWaitInQueue, CanPathfind, HasWaitingQueue, IsAiControlled, IsBank, IsDrink,
};
use crate::pathfinding::{Pathfinder, is_walkable};
use crate::query::{GameQueryExt, query};
use crate::world::{GameResources, GameWorld};

/// Outcome of one movement step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    /// Within arrival radius of the target.
    Arrived,
    /// Moved toward the target.
    Walking,
    /// No path exists, or the entity cannot move.
    NoRoute,
}

/// Moves `id` up to `step` tiles along a path to `target`, planning a new
/// path when the target changed.
pub fn walk_toward(
    store: &mut EntityStore,
    pathfinder: &dyn Pathfinder,
    id: EntityId,
    target: Vec2,
    step: f32,
) -> Walk {
    let Some(entity) = store.get_by_id(id) else {
        return Walk::NoRoute;
    };
    let (Some(transform), Some(pf)) = (entity.try_get::<Transform>(), entity.try_get::<CanPathfind>())
    else {
        return Walk::NoRoute;
    };
    let pos = transform.as2();
    if pos.distance(target) < CanPathfind::ARRIVAL_RADIUS {
        return Walk::Arrived;
    }
    let new_path = if pf.needs_path_to(target) {
        let readonly: &EntityStore = store;
        let walkable = |p: Vec2| is_walkable(readonly, p);
        Some(pathfinder.find_path(pos, target, &walkable))
    } else {
        None
    };

    let entity = store.get_enforced_mut(id);
    let pf = entity.get_mut::<CanPathfind>();
    if let Some(path) = new_path {
        pf.update_path(target, path);
    }
    let waypoint = match pf.next_waypoint(pos) {
        Some(waypoint) => waypoint,
        None if to_cell(pos) == to_cell(target) => target,
        None => return Walk::NoRoute,
    };
    let transform = entity.get_mut::<Transform>();
    transform.turn_to_face(waypoint);
    transform.update_xz(pos + (waypoint - pos).clamp_length_max(step));
    Walk::Walking
}

/// Removes `id` from the register line it joined, if any.
fn leave_line(store: &mut EntityStore, id: EntityId) {
    let Some(register) = store
        .get_by_id_mut(id)
        .and_then(|e| e.try_get_mut::<AiWaitInQueue>())
        .and_then(|w| w.register.take())
    else {
        return;
    };
    let Some(line) = store
        .get_by_id_mut(register)
        .and_then(|e| e.try_get_mut::<HasWaitingQueue>())
    else {
        return;
    };
    if let Some(position) = line.position_of(id) {
        line.erase(position);
        debug!(customer = %id, %register, position, "left line");
    }
}

/// Picks the register with the shortest line that has room and joins it.
fn join_shortest_line(store: &mut EntityStore, id: EntityId) -> Option<(EntityId, usize)> {
    let register = query(store)
        .where_has_and::<HasWaitingQueue>(HasWaitingQueue::has_space)
        .where_has::<Transform>()
        .order_by("shortest_line", |a, b| {
            let a = a.get::<HasWaitingQueue>().get_next_pos();
            let b = b.get::<HasWaitingQueue>().get_next_pos();
            a.cmp(&b)
        })
        .gen_first_id()?;
    let position = store
        .get_enforced_mut(register)
        .get_mut::<HasWaitingQueue>()
        .add_customer(id);
    store
        .get_by_id_mut(id)?
        .add_if_missing(AiWaitInQueue::default())
        .register = Some(register);
    debug!(customer = %id, %register, position, "joined line");
    Some((register, position))
}

/// Applies staged transitions.
#[derive(Debug, Default)]
pub struct AiCommitNextState;

impl EntitySystem<GameWorld> for AiCommitNextState {
    type Components = (IsAiControlled,);

    fn name(&self) -> &'static str {
        "ai_commit_next_state"
    }

    fn should_run(&self, world: &GameWorld, _dt: f32) -> bool {
        world.timer().is_some()
    }

    fn for_each_with<'e>(
        &mut self,
        entity: EntityMeta<'e>,
        (ai,): (&'e mut IsAiControlled,),
        _resources: &GameResources,
        _commands: &mut Commands,
        _dt: f32,
    ) {
        let from = ai.state;
        if let Some(to) = ai.commit_next_state() {
            debug!(entity = %entity.id, ?from, ?to, "ai state changed");
        }
    }
}

/// Sends wandering customers to the registers once the bar opens.
#[derive(Debug, Default)]
pub struct AiWander;

impl EntitySystem<GameWorld> for AiWander {
    type Components = (IsAiControlled,);

    fn name(&self) -> &'static str {
        "ai_wander"
    }

    fn should_run(&self, world: &GameWorld, _dt: f32) -> bool {
        world.is_bar_open()
    }

    fn for_each_with<'e>(
        &mut self,
        _entity: EntityMeta<'e>,
        (ai,): (&'e mut IsAiControlled,),
        _resources: &GameResources,
        _commands: &mut Commands,
        _dt: f32,
    ) {
        if ai.state == AiState::Wander {
            ai.set_next_state(AiState::QueueForRegister);
        }
    }
}

/// Lines customers up at the least busy register and walks them forward as
/// the line moves.
#[derive(Debug, Default)]
pub struct AiQueueForRegister;

impl OnceSystem<GameWorld> for AiQueueForRegister {
    fn name(&self) -> &'static str {
        "ai_queue_for_register"
    }

    fn should_run(&self, world: &GameWorld, _dt: f32) -> bool {
        world.timer().is_some()
    }

    fn once(&mut self, world: &mut GameWorld, dt: f32) {
        let step = world.config().ai_speed * dt;
        let (store, resources) = (&mut world.entities, &world.resources);
        let queueing = query(store)
            .where_has_and::<IsAiControlled>(|ai| ai.state == AiState::QueueForRegister)
            .gen_ids();
        for id in queueing {
            let current = store
                .get_by_id(id)
                .and_then(|e| e.try_get::<AiWaitInQueue>())
                .and_then(|w| w.register)
                .and_then(|register| {
                    let line = store.get_by_id(register)?.try_get::<HasWaitingQueue>()?;
                    Some((register, line.position_of(id)?))
                });
            let Some((register, position)) = current.or_else(|| join_shortest_line(store, id))
            else {
                continue;
            };
            let Some(spot) = store
                .get_by_id(register)
                .and_then(|r| r.try_get::<Transform>())
                .map(|t| t.tile_infront(position as i32 + 1))
            else {
                continue;
            };
            let walk = walk_toward(store, resources.pathfinder.as_ref(), id, spot, step);
            if walk == Walk::Arrived && position == 0 {
                if let Some(ai) = store
                    .get_by_id_mut(id)
                    .and_then(|e| e.try_get_mut::<IsAiControlled>())
                {
                    ai.set_next_state(AiState::AtRegisterWaitForDrink);
                }
            }
        }
    }
}

/// Customers at the front of a line pay for a finished drink and leave.
#[derive(Debug, Default)]
pub struct AiPayForDrink;

impl OnceSystem<GameWorld> for AiPayForDrink {
    fn name(&self) -> &'static str {
        "ai_pay_for_drink"
    }

    fn should_run(&self, world: &GameWorld, _dt: f32) -> bool {
        world.timer().is_some()
    }

    fn once(&mut self, world: &mut GameWorld, _dt: f32) {
        let store = &mut world.entities;
        let served = query(store)
            .where_has_and::<IsAiControlled>(|ai| ai.state == AiState::AtRegisterWaitForDrink)
            .where_held_item_matches(|item| {
                item.try_get::<IsDrink>()
                    .and_then(IsDrink::recipe)
                    .is_some()
            })
            .gen_ids();
        for id in served {
            let Some(item) = drop_item(store, id) else {
                continue;
            };
            let price = store
                .get_by_id(item)
                .and_then(|e| e.try_get::<IsDrink>())
                .and_then(IsDrink::recipe)
                .map_or(0, |drink| drink.price());
            store.mark_for_cleanup(item);
            if let Some(bank) = store
                .get_possible_named_entity_mut(NamedEntity::Sophie)
                .and_then(|e| e.try_get_mut::<IsBank>())
            {
                bank.deposit(price);
            }
            if let Some(ai) = store
                .get_by_id_mut(id)
                .and_then(|e| e.try_get_mut::<IsAiControlled>())
            {
                ai.set_next_state(AiState::Leave);
            }
            debug!(customer = %id, price, "paid for drink");
        }
    }
}

/// Walks leaving customers to the exit and removes them there.
///
/// A customer with no route out (e.g. shut in by a closed door) is removed
/// where it stands.
#[derive(Debug, Default)]
pub struct AiLeave;

impl OnceSystem<GameWorld> for AiLeave {
    fn name(&self) -> &'static str {
        "ai_leave"
    }

    fn should_run(&self, world: &GameWorld, _dt: f32) -> bool {
        world.timer().is_some()
    }

    fn once(&mut self, world: &mut GameWorld, dt: f32) {
        let step = world.config().ai_speed * dt;
        let exit = world.config().exit_position;
        let (store, resources) = (&mut world.entities, &world.resources);
        let leaving = query(store)
            .where_has_and::<IsAiControlled>(|ai| ai.state == AiState::Leave)
            .gen_ids();
        for id in leaving {
            leave_line(store, id);
            match walk_toward(store, resources.pathfinder.as_ref(), id, exit, step) {
                Walk::Walking => {}
                Walk::Arrived => {
                    debug!(customer = %id, "left the bar");
                    store.mark_for_cleanup(id);
                }
                Walk::NoRoute => {
                    debug!(customer = %id, "no route to the exit");
                    store.mark_for_cleanup(id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use barkeep_ecs::{EntityType, RunMode};
    use barkeep_math::FrontFaceDirection;

    use super::*;
    use crate::components::holding::give_item;
    use crate::components::Drink;
    use crate::config::GameConfig;
    use crate::makers::{make_customer, make_drink, make_register, make_sophie, make_wall};
    use crate::pathfinding::GridBfs;
    use crate::systems::{GameSystems, register_ai_systems};

    fn open_bar_world() -> GameWorld {
        let config = GameConfig {
            exit_position: Vec2::new(-6.0, 0.0),
            ..GameConfig::default()
        };
        let mut world = GameWorld::new(RunMode::Server, config.clone());
        make_sophie(&mut world.entities, &config);
        world.start_game().unwrap();
        world.timer_mut().unwrap().open_bar();
        world.timer_mut().unwrap().needs_to_process_change = false;
        world
    }

    fn spawn_customer(world: &mut GameWorld, pos: Vec2) -> EntityId {
        let e = world.entities.create();
        make_customer(e, pos);
        e.id
    }

    fn state(world: &GameWorld, id: EntityId) -> AiState {
        world.entities.get_enforced(id).get::<IsAiControlled>().state
    }

    fn run(systems: &mut GameSystems, world: &mut GameWorld, ticks: usize) {
        for _ in 0..ticks {
            systems.tick(world, &mut Default::default(), 0.25);
        }
    }

    #[test]
    fn test_walk_toward_routes_around_walls() {
        let mut store = EntityStore::new(RunMode::Server);
        let walker = {
            let e = store.create();
            make_customer(e, Vec2::ZERO);
            e.id
        };
        for z in -1..=1 {
            make_wall(store.create(), Vec2::new(1.0, z as f32));
        }
        let pathfinder = GridBfs::default();
        let target = Vec2::new(2.0, 0.0);
        let mut arrived = false;
        for _ in 0..40 {
            match walk_toward(&mut store, &pathfinder, walker, target, 0.5) {
                Walk::Arrived => {
                    arrived = true;
                    break;
                }
                Walk::Walking => {}
                Walk::NoRoute => panic!("walker should find a way around"),
            }
            let pos = store.get_enforced(walker).get::<Transform>().as2();
            assert!(is_walkable(&store, pos), "walked into a wall at {pos}");
        }
        assert!(arrived);
    }

    #[test]
    fn test_walk_toward_reports_no_route() {
        let mut store = EntityStore::new(RunMode::Server);
        let walker = {
            let e = store.create();
            make_customer(e, Vec2::ZERO);
            e.id
        };
        for (x, z) in [(1.0, 0.0), (-1.0, 0.0), (0.0, 1.0), (0.0, -1.0)] {
            make_wall(store.create(), Vec2::new(x, z));
        }
        let pathfinder = GridBfs { max_nodes: 100 };
        let walk = walk_toward(&mut store, &pathfinder, walker, Vec2::new(5.0, 0.0), 1.0);
        assert_eq!(walk, Walk::NoRoute);
    }

    #[test]
    fn test_customers_pick_shortest_line() {
        let mut world = open_bar_world();
        let busy = {
            let e = world.entities.create();
            make_register(e, Vec2::new(3.0, -3.0), FrontFaceDirection::Left);
            e.get_mut::<HasWaitingQueue>().add_customer(EntityId(9_000));
            e.id
        };
        let idle = {
            let e = world.entities.create();
            make_register(e, Vec2::new(3.0, 3.0), FrontFaceDirection::Left);
            e.id
        };
        let customer = spawn_customer(&mut world, Vec2::ZERO);

        let mut systems = GameSystems::new();
        register_ai_systems(&mut systems);
        // Tick 1 stages QueueForRegister, tick 2 commits it and joins a line.
        run(&mut systems, &mut world, 2);

        assert_eq!(state(&world, customer), AiState::QueueForRegister);
        let waiting = world.entities.get_enforced(customer).get::<AiWaitInQueue>();
        assert_eq!(waiting.register, Some(idle));
        let line = world.entities.get_enforced(idle).get::<HasWaitingQueue>();
        assert!(line.matching_id(customer, 0));
        let other = world.entities.get_enforced(busy).get::<HasWaitingQueue>();
        assert!(!other.has_matching_person(customer));

        // Walk to the front spot at (2, 3) and wait there.
        run(&mut systems, &mut world, 40);
        assert_eq!(state(&world, customer), AiState::AtRegisterWaitForDrink);
        let pos = world.entities.get_enforced(customer).get::<Transform>().as2();
        assert!(pos.distance(Vec2::new(2.0, 3.0)) < CanPathfind::ARRIVAL_RADIUS);
    }

    #[test]
    fn test_paid_customer_leaves_line_and_bar() {
        let mut world = open_bar_world();
        let register = {
            let e = world.entities.create();
            make_register(e, Vec2::new(3.0, 0.0), FrontFaceDirection::Left);
            e.id
        };
        let first = spawn_customer(&mut world, Vec2::new(2.0, 0.0));
        let second = spawn_customer(&mut world, Vec2::new(1.0, 0.0));
        let mut systems = GameSystems::new();
        register_ai_systems(&mut systems);
        run(&mut systems, &mut world, 4);
        assert_eq!(state(&world, first), AiState::AtRegisterWaitForDrink);

        let drink = {
            let e = world.entities.create();
            make_drink(e, Vec2::new(2.0, 0.0));
            for ingredient in Drink::RumAndCoke.ingredients() {
                e.get_mut::<IsDrink>().add_ingredient(*ingredient);
            }
            e.id
        };
        assert!(give_item(&mut world.entities, first, drink));
        let before = world
            .entities
            .get_named_entity(NamedEntity::Sophie)
            .get::<IsBank>()
            .balance();
        let swept = world.entities.len();
        run(&mut systems, &mut world, 2);

        let bank = world
            .entities
            .get_named_entity(NamedEntity::Sophie)
            .get::<IsBank>()
            .balance();
        assert_eq!(bank, before + Drink::RumAndCoke.price());
        assert!(world.entities.get_by_id(drink).is_none());
        assert!(world.entities.len() < swept);
        assert_eq!(state(&world, first), AiState::Leave);
        let line = world.entities.get_enforced(register).get::<HasWaitingQueue>();
        assert!(line.matching_id(second, 0));

        run(&mut systems, &mut world, 80);
        assert!(world.entities.get_by_id(first).is_none());
        assert_eq!(
            query(&world.entities)
                .where_type(EntityType::Customer)
                .gen_ids(),
            vec![second]
        );
    }

    #[test]
    fn test_ai_idle_outside_gameplay() {
        let mut world = GameWorld::new(RunMode::Server, GameConfig::default());
        let config = world.config().clone();
        make_sophie(&mut world.entities, &config);
        let customer = spawn_customer(&mut world, Vec2::ZERO);
        world
            .entities
            .get_enforced_mut(customer)
            .get_mut::<IsAiControlled>()
            .force_next_state(AiState::Leave);
        let mut systems = GameSystems::new();
        register_ai_systems(&mut systems);
        run(&mut systems, &mut world, 3);
        // Still in the lobby: nothing commits.
        assert_eq!(state(&world, customer), AiState::Wander);
        let ai = world.entities.get_enforced(customer).get::<IsAiControlled>();
        assert_eq!(ai.next_state(), Some(AiState::Leave));
    }
}
