//! The world context handed to every system.
//!
//! [`GameWorld`] owns the entity store and the shared resources (game state,
//! config and the pathfinding collaborator). The day/night gate helpers live
//! here so every system resolves the round timer the same way: if the game
//! is not in a gameplay state, or the singleton holding the timer does not
//! exist yet, the system is simply not applicable this tick.

use std::fmt;

use barkeep_ecs::{Entity, EntityStore, NamedEntity, RunMode, WorldAccess};

use crate::components::HasDayNightTimer;
use crate::config::GameConfig;
use crate::error::GameError;
use crate::pathfinding::{GridBfs, Pathfinder};
use crate::round::{GameState, StateManager};

/// Shared state systems read while entities are borrowed.
pub struct GameResources {
    /// Top-level game state.
    pub state: StateManager,
    /// Balance and layout knobs.
    pub config: GameConfig,
    /// Path search used by AI movement and reachability queries.
    pub pathfinder: Box<dyn Pathfinder>,
}

impl GameResources {
    /// Resources with a [`GridBfs`] pathfinder bounded by the config.
    #[must_use]
    pub fn new(config: GameConfig) -> Self {
        let pathfinder = GridBfs {
            max_nodes: config.pathfinding_max_nodes,
        };
        Self {
            state: StateManager::new(),
            config,
            pathfinder: Box::new(pathfinder),
        }
    }
}

impl fmt::Debug for GameResources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameResources")
            .field("state", &self.state)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Entity store plus resources.
#[derive(Debug)]
pub struct GameWorld {
    /// Every live entity.
    pub entities: EntityStore,
    /// Shared state.
    pub resources: GameResources,
}

impl GameWorld {
    /// Creates an empty world in the lobby.
    #[must_use]
    pub fn new(mode: RunMode, config: GameConfig) -> Self {
        Self {
            entities: EntityStore::new(mode),
            resources: GameResources::new(config),
        }
    }

    /// The config.
    #[must_use]
    pub fn config(&self) -> &GameConfig {
        &self.resources.config
    }

    /// The current game state.
    #[must_use]
    pub fn state(&self) -> GameState {
        self.resources.state.current()
    }

    /// Requests a game state change.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidTransition`] if the edge is not allowed.
    pub fn set_state(&mut self, next: GameState) -> Result<(), GameError> {
        self.resources.state.set(next)
    }

    /// Leaves the lobby and starts the first day.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidTransition`] outside the lobby.
    pub fn start_game(&mut self) -> Result<(), GameError> {
        self.set_state(GameState::Planning)
    }

    /// Leaves the lobby for a world restored from a save, landing in the
    /// state that matches the loaded round timer: `InRound` if the bar is
    /// open, otherwise `Planning`.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidTransition`] outside the lobby.
    pub fn resume_from_timer(&mut self) -> Result<(), GameError> {
        self.start_game()?;
        if self.is_bar_open() {
            self.set_state(GameState::InRound)?;
        }
        Ok(())
    }

    /// Player is done with upgrades; opens the store.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidTransition`] outside `Progression`.
    pub fn finish_progression(&mut self) -> Result<(), GameError> {
        self.set_state(GameState::Store)
    }

    /// Player leaves the store; the next day begins.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidTransition`] outside `Store`.
    pub fn leave_store(&mut self) -> Result<(), GameError> {
        self.set_state(GameState::Planning)
    }

    /// The singleton carrying the round timer, if the game is in a gameplay
    /// state and the singleton exists.
    #[must_use]
    pub fn sophie(&self) -> Option<&Entity> {
        if !self.resources.state.is_game_like() {
            return None;
        }
        self.entities.get_possible_named_entity(NamedEntity::Sophie)
    }

    /// Mutable variant of [`GameWorld::sophie`].
    #[must_use]
    pub fn sophie_mut(&mut self) -> Option<&mut Entity> {
        if !self.resources.state.is_game_like() {
            return None;
        }
        self.entities.get_possible_named_entity_mut(NamedEntity::Sophie)
    }

    /// The round timer, gated as described in [`GameWorld::sophie`].
    #[must_use]
    pub fn timer(&self) -> Option<&HasDayNightTimer> {
        self.sophie()?.try_get::<HasDayNightTimer>()
    }

    /// Mutable variant of [`GameWorld::timer`].
    #[must_use]
    pub fn timer_mut(&mut self) -> Option<&mut HasDayNightTimer> {
        self.sophie_mut()?.try_get_mut::<HasDayNightTimer>()
    }

    /// Returns `true` if the timer is resolvable and the bar is open.
    #[must_use]
    pub fn is_bar_open(&self) -> bool {
        self.timer().is_some_and(HasDayNightTimer::is_bar_open)
    }

    /// Returns `true` during the tick in which night began.
    #[must_use]
    pub fn entered_night(&self) -> bool {
        self.timer()
            .is_some_and(|t| t.needs_to_process_change && t.is_bar_open())
    }

    /// Returns `true` during the tick in which day began.
    #[must_use]
    pub fn entered_day(&self) -> bool {
        self.timer()
            .is_some_and(|t| t.needs_to_process_change && t.is_bar_closed())
    }
}

impl WorldAccess for GameWorld {
    type Resources = GameResources;

    fn entities(&self) -> &EntityStore {
        &self.entities
    }

    fn entities_mut(&mut self) -> &mut EntityStore {
        &mut self.entities
    }

    fn split_mut(&mut self) -> (&mut EntityStore, &GameResources) {
        (&mut self.entities, &self.resources)
    }
}

#[cfg(test)]
mod tests {
    use barkeep_ecs::EntityType;

    use super::*;

    fn world_with_timer() -> GameWorld {
        let mut world = GameWorld::new(RunMode::Server, GameConfig::default());
        let sophie = world.entities.create_permanent();
        sophie.entity_type = EntityType::Sophie;
        sophie.add(HasDayNightTimer::new(1.0, 1.0));
        world
    }

    #[test]
    fn test_timer_gated_on_game_like_state() {
        let mut world = world_with_timer();
        assert!(world.timer().is_none());
        world.start_game().unwrap();
        assert!(world.timer().is_some());
    }

    #[test]
    fn test_timer_missing_singleton_is_not_an_error() {
        let mut world = GameWorld::new(RunMode::Server, GameConfig::default());
        world.start_game().unwrap();
        assert!(world.timer().is_none());
        assert!(!world.entered_day());
        assert!(!world.entered_night());
    }

    #[test]
    fn test_entered_flags_follow_direction() {
        let mut world = world_with_timer();
        world.start_game().unwrap();
        assert!(!world.entered_night());

        world.timer_mut().unwrap().open_bar();
        assert!(world.entered_night());
        assert!(!world.entered_day());
        assert!(world.is_bar_open());

        world.timer_mut().unwrap().close_bar();
        assert!(world.entered_day());
        assert!(!world.entered_night());
    }

    #[test]
    fn test_resume_follows_timer_phase() {
        let mut world = world_with_timer();
        world.resume_from_timer().unwrap();
        assert_eq!(world.state(), GameState::Planning);

        let mut world = world_with_timer();
        world
            .entities
            .get_possible_named_entity_mut(NamedEntity::Sophie)
            .unwrap()
            .get_mut::<HasDayNightTimer>()
            .open_bar();
        world.resume_from_timer().unwrap();
        assert_eq!(world.state(), GameState::InRound);
        assert!(world.resume_from_timer().is_err());
    }

    #[test]
    fn test_player_driven_transitions() {
        let mut world = world_with_timer();
        assert!(world.finish_progression().is_err());
        world.start_game().unwrap();
        world.set_state(GameState::InRound).unwrap();
        world.set_state(GameState::Progression).unwrap();
        world.finish_progression().unwrap();
        world.leave_store().unwrap();
        assert_eq!(world.state(), GameState::Planning);
    }
}
