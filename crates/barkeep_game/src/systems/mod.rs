//! Gameplay systems and their registration order.
//!
//! Order matters: the timer runs first so every later system sees this
//! tick's phase, the transition systems run while the day/night flag is
//! set, and the flag reset runs last.

pub mod ai;
pub mod round;
pub mod spawner;

use barkeep_ecs::SystemManager;

use crate::render::{CollectDrawCommands, DrawList};
use crate::world::GameWorld;

pub use ai::{
    AiCommitNextState, AiLeave, AiPayForDrink, AiQueueForRegister, AiWander, Walk, walk_toward,
};
pub use round::{
    CleanUpOldStoreOptions, DayStartHooks, DeleteFloatingItems, GenerateStoreOptions,
    NightStartHooks, ResetCustomerSpawners, ResetHasDayNightChanged, ResetRegisterQueues,
    ResetToilets, RunTimer, TellCustomersToLeave, UpdateMaxCustomers,
};
pub use spawner::ProcessSpawners;

/// The system manager used by the game.
pub type GameSystems = SystemManager<GameWorld, DrawList>;

/// Registers the customer AI in dependency order.
pub fn register_ai_systems(systems: &mut GameSystems) {
    systems
        .register_for_each(AiCommitNextState)
        .register_for_each(AiWander)
        .register_once(AiQueueForRegister)
        .register_once(AiPayForDrink)
        .register_once(AiLeave);
}

/// Registers the systems that react to day or night starting.
pub fn register_transition_systems(systems: &mut GameSystems) {
    systems
        .register_once(CleanUpOldStoreOptions)
        .register_once(GenerateStoreOptions)
        .register_once(DeleteFloatingItems)
        .register_for_each(TellCustomersToLeave)
        .register_for_each(ResetToilets)
        .register_for_each(ResetCustomerSpawners)
        .register_for_each(ResetRegisterQueues)
        .register_once(UpdateMaxCustomers)
        .register_once(DayStartHooks)
        .register_once(NightStartHooks);
}

/// Registers the day/night flag reset. Must come after every system gated
/// on the flag.
pub fn register_flag_reset(systems: &mut GameSystems) {
    systems.register_once(ResetHasDayNightChanged);
}

/// Builds the full game pipeline.
#[must_use]
pub fn register_all() -> GameSystems {
    let mut systems = GameSystems::new();
    systems
        .register_once(RunTimer)
        .register_once(ProcessSpawners);
    register_ai_systems(&mut systems);
    register_transition_systems(&mut systems);
    register_flag_reset(&mut systems);
    systems.register_render(CollectDrawCommands);
    tracing::debug!(
        update = ?systems.update_names(),
        render = ?systems.render_names(),
        "registered systems"
    );
    systems
}
