//! Round timer and day/night transition systems.
//!
//! [`RunTimer`] is the only system that sets the timer's
//! `needs_to_process_change` flag. Every transition system is gated on that
//! flag plus a direction ([`GameWorld::entered_day`] /
//! [`GameWorld::entered_night`]) and never clears it;
//! [`ResetHasDayNightChanged`] clears it and must be registered after all
//! of them.

use barkeep_ecs::{
    Commands, ComponentTuple, EntityId, EntityMeta, EntityQuery, EntitySystem, OnceSystem,
};
use barkeep_math::Vec2;
use tracing::{debug, info, warn};

use crate::components::{
    AiState, DayNightHook, HasDayNightTimer, HasWaitingQueue, IsAiControlled, IsBank, IsItem,
    IsSpawner, IsStoreSpawned, IsToilet, RespondsToDayNight, SpawnKind,
};
use crate::makers::make_store_item;
use crate::query::{GameQueryExt, query};
use crate::round::GameState;
use crate::world::{GameResources, GameWorld};

/// Counts the current phase down and flips day/night when it runs out.
///
/// Day expiry opens the bar and moves `Planning -> InRound`. Night expiry
/// closes the bar, charges any rent due and moves `InRound -> Progression`.
#[derive(Debug, Default)]
pub struct RunTimer;

impl OnceSystem<GameWorld> for RunTimer {
    fn name(&self) -> &'static str {
        "run_timer"
    }

    fn should_run(&self, world: &GameWorld, _dt: f32) -> bool {
        world.state().runs_timer() && world.timer().is_some()
    }

    fn once(&mut self, world: &mut GameWorld, dt: f32) {
        let increase = world.config().rent_increase;
        let from = world.state();
        let Some(sophie) = world.sophie_mut() else {
            return;
        };
        let closing = {
            let timer = sophie.get_mut::<HasDayNightTimer>();
            timer.pass_time(dt);
            if !timer.is_round_over() {
                return;
            }
            let closing = timer.is_bar_open();
            let next = phase_end_state(closing);
            if from != next && !from.can_transition_to(next) {
                warn!(%from, to = %next, "round over but the game state cannot follow; holding the timer");
                return;
            }
            if closing {
                timer.close_bar();
                info!(day = timer.days_passed(), "bar closed");
            } else {
                timer.open_bar();
                info!(day = timer.days_passed(), "bar opened");
            }
            closing
        };
        if closing {
            let (_, storage) = sophie.split_mut();
            if let Some((timer, bank)) =
                <(HasDayNightTimer, IsBank) as ComponentTuple>::fetch(storage)
            {
                if let Some(paid) = timer.collect_rent(bank, increase) {
                    info!(paid, balance = bank.balance(), next = timer.rent_due(), "rent collected");
                }
            }
        }
        if let Err(err) = world.set_state(phase_end_state(closing)) {
            warn!(%err, "round timer could not advance the game state");
        }
    }
}

fn phase_end_state(closing: bool) -> GameState {
    if closing {
        GameState::Progression
    } else {
        GameState::InRound
    }
}

/// Removes yesterday's unsold store items.
#[derive(Debug, Default)]
pub struct CleanUpOldStoreOptions;

impl OnceSystem<GameWorld> for CleanUpOldStoreOptions {
    fn name(&self) -> &'static str {
        "clean_up_old_store_options"
    }

    fn should_run(&self, world: &GameWorld, _dt: f32) -> bool {
        world.entered_day()
    }

    fn once(&mut self, world: &mut GameWorld, _dt: f32) {
        let stale = query(&world.entities)
            .include_store_entities()
            .where_has::<IsStoreSpawned>()
            .where_is_not_being_held()
            .gen_ids();
        debug!(count = stale.len(), "removing old store options");
        for id in stale {
            world.entities.mark_for_cleanup(id);
        }
    }
}

/// Lays out a fresh set of store items.
#[derive(Debug, Default)]
pub struct GenerateStoreOptions;

impl OnceSystem<GameWorld> for GenerateStoreOptions {
    fn name(&self) -> &'static str {
        "generate_store_options"
    }

    fn should_run(&self, world: &GameWorld, _dt: f32) -> bool {
        world.entered_day()
    }

    fn once(&mut self, world: &mut GameWorld, _dt: f32) {
        let origin = world.config().store_origin;
        let count = world.config().store_option_count;
        for i in 0..count {
            let pos = origin + Vec2::new(2.0 * i as f32, 0.0);
            make_store_item(world.entities.create(), pos);
        }
        debug!(count, "generated store options");
    }
}

/// Removes items left lying around when the bar closes.
#[derive(Debug, Default)]
pub struct DeleteFloatingItems;

impl OnceSystem<GameWorld> for DeleteFloatingItems {
    fn name(&self) -> &'static str {
        "delete_floating_items"
    }

    fn should_run(&self, world: &GameWorld, _dt: f32) -> bool {
        world.entered_day()
    }

    fn once(&mut self, world: &mut GameWorld, _dt: f32) {
        let floating = query(&world.entities)
            .where_has::<IsItem>()
            .where_is_not_being_held()
            .gen_ids();
        debug!(count = floating.len(), "deleting floating items");
        for id in floating {
            world.entities.mark_for_cleanup(id);
        }
    }
}

/// Sends every customer home.
#[derive(Debug, Default)]
pub struct TellCustomersToLeave;

impl EntitySystem<GameWorld> for TellCustomersToLeave {
    type Components = (IsAiControlled,);

    fn name(&self) -> &'static str {
        "tell_customers_to_leave"
    }

    fn should_run(&self, world: &GameWorld, _dt: f32) -> bool {
        world.entered_day()
    }

    fn for_each_with<'e>(
        &mut self,
        _entity: EntityMeta<'e>,
        (ai,): (&'e mut IsAiControlled,),
        _resources: &GameResources,
        _commands: &mut Commands,
        _dt: f32,
    ) {
        ai.force_next_state(AiState::Leave);
    }
}

/// Frees and cleans every toilet.
#[derive(Debug, Default)]
pub struct ResetToilets;

impl EntitySystem<GameWorld> for ResetToilets {
    type Components = (IsToilet,);

    fn name(&self) -> &'static str {
        "reset_toilets"
    }

    fn should_run(&self, world: &GameWorld, _dt: f32) -> bool {
        world.entered_day()
    }

    fn for_each_with<'e>(
        &mut self,
        _entity: EntityMeta<'e>,
        (toilet,): (&'e mut IsToilet,),
        _resources: &GameResources,
        _commands: &mut Commands,
        _dt: f32,
    ) {
        toilet.reset();
    }
}

/// Restarts customer spawners for the coming night.
#[derive(Debug, Default)]
pub struct ResetCustomerSpawners;

impl EntitySystem<GameWorld> for ResetCustomerSpawners {
    type Components = (IsSpawner,);

    fn name(&self) -> &'static str {
        "reset_customer_spawners"
    }

    fn should_run(&self, world: &GameWorld, _dt: f32) -> bool {
        world.entered_day()
    }

    fn for_each_with<'e>(
        &mut self,
        _entity: EntityMeta<'e>,
        (spawner,): (&'e mut IsSpawner,),
        _resources: &GameResources,
        _commands: &mut Commands,
        _dt: f32,
    ) {
        if spawner.kind() == SpawnKind::Customer {
            spawner.reset_num_spawned();
        }
    }
}

/// Empties every register line.
#[derive(Debug, Default)]
pub struct ResetRegisterQueues;

impl EntitySystem<GameWorld> for ResetRegisterQueues {
    type Components = (HasWaitingQueue,);

    fn name(&self) -> &'static str {
        "reset_register_queues"
    }

    fn should_run(&self, world: &GameWorld, _dt: f32) -> bool {
        world.entered_day()
    }

    fn for_each_with<'e>(
        &mut self,
        _entity: EntityMeta<'e>,
        (line,): (&'e mut HasWaitingQueue,),
        _resources: &GameResources,
        _commands: &mut Commands,
        _dt: f32,
    ) {
        line.clear();
    }
}

/// Raises the customer count for the coming night.
#[derive(Debug, Default)]
pub struct UpdateMaxCustomers;

impl OnceSystem<GameWorld> for UpdateMaxCustomers {
    fn name(&self) -> &'static str {
        "update_max_customers"
    }

    fn should_run(&self, world: &GameWorld, _dt: f32) -> bool {
        world.entered_day()
    }

    fn once(&mut self, world: &mut GameWorld, _dt: f32) {
        let Some(day) = world.timer().map(HasDayNightTimer::days_passed) else {
            return;
        };
        let total = world.config().customers_for_day(day);
        for entity in world.entities.iter_mut() {
            if let Some(spawner) = entity.try_get_mut::<IsSpawner>() {
                if spawner.kind() == SpawnKind::Customer {
                    spawner.update_total(total);
                }
            }
        }
        debug!(day, total, "updated customer count");
    }
}

/// Applies `hooks` of every [`RespondsToDayNight`] to its parent entity.
fn apply_hooks(world: &mut GameWorld, hooks: fn(&RespondsToDayNight) -> Vec<DayNightHook>) {
    let pending: Vec<(EntityId, Vec<DayNightHook>)> = EntityQuery::new(&world.entities)
        .where_has::<RespondsToDayNight>()
        .gen_all()
        .into_iter()
        .map(|e| {
            let responds = e.get::<RespondsToDayNight>();
            (responds.parent, hooks(responds))
        })
        .filter(|(_, list)| !list.is_empty())
        .collect();
    for (parent, hooks) in pending {
        let Some(entity) = world.entities.get_by_id_mut(parent) else {
            warn!(entity = %parent, "day/night hook parent is missing");
            continue;
        };
        for hook in hooks {
            debug!(entity = %parent, ?hook, "applying day/night hook");
            hook.apply(entity);
        }
    }
    world.entities.invalidate_walkable();
}

/// Runs the night-ended and day-started hooks.
#[derive(Debug, Default)]
pub struct DayStartHooks;

impl OnceSystem<GameWorld> for DayStartHooks {
    fn name(&self) -> &'static str {
        "day_start_hooks"
    }

    fn should_run(&self, world: &GameWorld, _dt: f32) -> bool {
        world.entered_day()
    }

    fn once(&mut self, world: &mut GameWorld, _dt: f32) {
        apply_hooks(world, RespondsToDayNight::day_start_hooks);
    }
}

/// Runs the day-ended and night-started hooks.
#[derive(Debug, Default)]
pub struct NightStartHooks;

impl OnceSystem<GameWorld> for NightStartHooks {
    fn name(&self) -> &'static str {
        "night_start_hooks"
    }

    fn should_run(&self, world: &GameWorld, _dt: f32) -> bool {
        world.entered_night()
    }

    fn once(&mut self, world: &mut GameWorld, _dt: f32) {
        apply_hooks(world, RespondsToDayNight::night_start_hooks);
    }
}

/// Clears the transition flag. Registered after every transition system.
#[derive(Debug, Default)]
pub struct ResetHasDayNightChanged;

impl OnceSystem<GameWorld> for ResetHasDayNightChanged {
    fn name(&self) -> &'static str {
        "reset_has_day_night_changed"
    }

    fn should_run(&self, world: &GameWorld, _dt: f32) -> bool {
        world.timer().is_some_and(|t| t.needs_to_process_change)
    }

    fn once(&mut self, world: &mut GameWorld, _dt: f32) {
        if let Some(timer) = world.timer_mut() {
            timer.needs_to_process_change = false;
            debug!("day/night change processed");
        }
    }
}

#[cfg(test)]
mod tests {
    use barkeep_ecs::{NamedEntity, RunMode};
    use barkeep_math::Transform;

    use super::*;
    use crate::components::IsSolid;
    use crate::config::GameConfig;
    use crate::makers::{make_customer, make_door, make_sophie, make_toilet};
    use crate::systems::{GameSystems, register_flag_reset, register_transition_systems};

    fn world(day: f32, night: f32) -> GameWorld {
        let config = GameConfig {
            day_length: day,
            night_length: night,
            rent_days: 1,
            rent_initial: 30,
            rent_increase: 10,
            starting_balance: 100,
            ..GameConfig::default()
        };
        let mut world = GameWorld::new(RunMode::Server, config.clone());
        make_sophie(&mut world.entities, &config);
        world.start_game().unwrap();
        world
    }

    fn timer(world: &GameWorld) -> &HasDayNightTimer {
        world
            .entities
            .get_named_entity(NamedEntity::Sophie)
            .get::<HasDayNightTimer>()
    }

    /// Counts how often it saw the night-start flag.
    #[derive(Default)]
    struct CountNightStarts(std::sync::Arc<std::sync::atomic::AtomicUsize>);

    impl OnceSystem<GameWorld> for CountNightStarts {
        fn name(&self) -> &'static str {
            "count_night_starts"
        }

        fn should_run(&self, world: &GameWorld, _dt: f32) -> bool {
            world.entered_night()
        }

        fn once(&mut self, _world: &mut GameWorld, _dt: f32) {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }
    }

    #[test]
    fn test_timer_drives_states_and_rent() {
        let mut w = world(2.0, 2.0);
        let mut systems = GameSystems::new();
        systems.register_once(RunTimer);
        register_flag_reset(&mut systems);

        systems.update(&mut w, 1.0);
        assert_eq!(w.state(), GameState::Planning);
        systems.update(&mut w, 1.0);
        assert_eq!(w.state(), GameState::InRound);
        assert!(timer(&w).is_bar_open());
        assert_eq!(timer(&w).days_passed(), 1);

        systems.update(&mut w, 1.0);
        systems.update(&mut w, 1.0);
        assert_eq!(w.state(), GameState::Progression);
        let sophie = w.entities.get_named_entity(NamedEntity::Sophie);
        assert_eq!(sophie.get::<IsBank>().balance(), 70);
        assert_eq!(sophie.get::<HasDayNightTimer>().rent_due(), 40);

        // Outside Planning/InRound the timer stands still.
        let left = timer(&w).current_length();
        systems.update(&mut w, 1.0);
        assert!((timer(&w).current_length() - left).abs() < f32::EPSILON);
    }

    #[test]
    fn test_timer_held_when_state_cannot_follow() {
        let mut w = world(1.0, 1.0);
        {
            let timer = w.timer_mut().unwrap();
            timer.open_bar();
            timer.needs_to_process_change = false;
        }
        let mut systems = GameSystems::new();
        systems.register_once(RunTimer);

        // Night expires while still in Planning: Planning -> Progression is
        // not an edge, so neither the timer nor the bank may move.
        for _ in 0..3 {
            systems.update(&mut w, 1.0);
        }
        assert_eq!(w.state(), GameState::Planning);
        assert!(timer(&w).is_bar_open());
        assert_eq!(timer(&w).days_passed(), 1);
        assert!(timer(&w).is_round_over());
        let sophie = w.entities.get_named_entity(NamedEntity::Sophie);
        assert_eq!(sophie.get::<IsBank>().balance(), 100);
    }

    #[test]
    fn test_transition_flag_fires_once() {
        let mut w = world(1.0, 100.0);
        let seen = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let mut systems = GameSystems::new();
        systems.register_once(RunTimer);
        register_transition_systems(&mut systems);
        systems.register_once(CountNightStarts(std::sync::Arc::clone(&seen)));
        register_flag_reset(&mut systems);

        for _ in 0..5 {
            systems.update(&mut w, 1.0);
            // The flag never survives the tick that raised it.
            assert!(!timer(&w).needs_to_process_change);
        }
        assert_eq!(seen.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(w.state(), GameState::InRound);
    }

    #[test]
    fn test_day_start_resets_the_bar() {
        let mut w = world(1.0, 1.0);
        let door = {
            let e = w.entities.create();
            make_door(e, Vec2::new(-8.0, 0.0));
            e.id
        };
        let toilet = {
            let e = w.entities.create();
            make_toilet(e, Vec2::new(5.0, 5.0));
            e.get_mut::<IsToilet>().uses = 3;
            e.id
        };
        let customer = {
            let e = w.entities.create();
            make_customer(e, Vec2::ZERO);
            e.id
        };
        let spawner = {
            let e = w.entities.create();
            e.add(Transform::default());
            e.add(IsSpawner::new(SpawnKind::Customer).set_total(1).set_time_between(1.0));
            e.get_mut::<IsSpawner>().post_spawn_reset();
            e.id
        };
        let mut systems = GameSystems::new();
        systems.register_once(RunTimer);
        register_transition_systems(&mut systems);
        register_flag_reset(&mut systems);

        // Day ends: the door opens.
        systems.tick(&mut w, &mut Default::default(), 1.0);
        assert!(w.entities.get_enforced(door).is_missing::<IsSolid>());

        // Night ends: everything resets for the next day.
        let swept = systems.tick(&mut w, &mut Default::default(), 1.0);
        assert!(swept.is_empty());
        assert!(w.entities.get_enforced(door).has::<IsSolid>());
        assert_eq!(w.entities.get_enforced(toilet).get::<IsToilet>().uses, 0);
        let ai = w.entities.get_enforced(customer).get::<IsAiControlled>();
        assert_eq!(ai.next_state(), Some(AiState::Leave));
        let spawner = w.entities.get_enforced(spawner).get::<IsSpawner>();
        assert_eq!(spawner.num_spawned(), 0);
        assert_eq!(spawner.max_spawned(), w.config().customers_for_day(1));
        let options = query(&w.entities)
            .include_store_entities()
            .where_has::<IsStoreSpawned>()
            .gen_count();
        assert_eq!(options, w.config().store_option_count);
    }

    #[test]
    fn test_gated_systems_skip_without_singleton() {
        let mut w = GameWorld::new(RunMode::Server, GameConfig::default());
        w.start_game().unwrap();
        let mut systems = GameSystems::new();
        systems.register_once(RunTimer);
        register_transition_systems(&mut systems);
        register_flag_reset(&mut systems);
        systems.update(&mut w, 100.0);
        assert_eq!(w.state(), GameState::Planning);
        assert!(w.entities.is_empty());
    }
}
