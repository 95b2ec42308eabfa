//! Game state machine.
//!
//! ```text
//! Lobby -> Planning --(day ends)--> InRound --(night ends)--> Progression
//!             ^                                                   |
//!             +------------------- Store <------------------------+
//! ```
//!
//! `Planning` is the day phase and `InRound` the night phase. The day/night
//! timer drives `Planning -> InRound -> Progression`; the remaining edges
//! are player driven. Rounds repeat until the process exits.

use std::fmt;

use crate::error::GameError;

/// Top-level game states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GameState {
    /// Menu / waiting for players.
    #[default]
    Lobby,
    /// Model preview sandbox.
    ModelTest,
    /// Day: build and prepare.
    Planning,
    /// Night: the bar is open.
    InRound,
    /// Post-night upgrades.
    Progression,
    /// Buying items for the next day.
    Store,
    /// Picking a save slot.
    LoadSaveRoom,
}

impl GameState {
    /// States in which the round timer exists and gameplay systems apply.
    #[must_use]
    pub const fn is_game_like(self) -> bool {
        matches!(
            self,
            GameState::Planning | GameState::InRound | GameState::Progression | GameState::Store
        )
    }

    /// States in which the round timer counts down.
    #[must_use]
    pub const fn runs_timer(self) -> bool {
        matches!(self, GameState::Planning | GameState::InRound)
    }

    /// Returns `true` if the machine may move from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: GameState) -> bool {
        use GameState::*;
        matches!(
            (self, next),
            (Lobby, Planning | ModelTest | LoadSaveRoom)
                | (ModelTest | LoadSaveRoom, Lobby)
                | (LoadSaveRoom, Planning)
                | (Planning, InRound)
                | (InRound, Progression)
                | (Progression, Store)
                | (Store, Planning)
                | (Planning | InRound | Progression | Store, Lobby)
        )
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

type Listener = Box<dyn Fn(GameState, GameState) + Send + Sync>;

/// Current state, history and change listeners.
pub struct StateManager {
    current: GameState,
    history: Vec<GameState>,
    listeners: Vec<Listener>,
}

impl StateManager {
    /// Creates a manager in [`GameState::Lobby`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: GameState::Lobby,
            history: Vec::new(),
            listeners: Vec::new(),
        }
    }

    /// The current state.
    #[must_use]
    pub fn current(&self) -> GameState {
        self.current
    }

    /// The state before the current one.
    #[must_use]
    pub fn previous(&self) -> Option<GameState> {
        self.history.last().copied()
    }

    /// Returns `true` if the current state is `state`.
    #[must_use]
    pub fn is(&self, state: GameState) -> bool {
        self.current == state
    }

    /// Returns `true` if the current state is not `state`.
    #[must_use]
    pub fn is_not(&self, state: GameState) -> bool {
        self.current != state
    }

    /// Returns `true` in any gameplay state.
    #[must_use]
    pub fn is_game_like(&self) -> bool {
        self.current.is_game_like()
    }

    /// Registers a callback run with `(from, to)` on every change.
    pub fn on_change(&mut self, listener: impl Fn(GameState, GameState) + Send + Sync + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Moves to `next`. Setting the current state again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidTransition`] if the edge is not in the
    /// transition table.
    pub fn set(&mut self, next: GameState) -> Result<(), GameError> {
        if next == self.current {
            return Ok(());
        }
        if !self.current.can_transition_to(next) {
            return Err(GameError::InvalidTransition {
                from: self.current,
                to: next,
            });
        }
        self.history.push(self.current);
        self.switch(next);
        Ok(())
    }

    /// Returns to the previous state.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NoPreviousState`] if there is no history.
    pub fn go_back(&mut self) -> Result<(), GameError> {
        let previous = self.history.pop().ok_or(GameError::NoPreviousState)?;
        self.switch(previous);
        Ok(())
    }

    /// Returns to the lobby and forgets the history.
    pub fn reset(&mut self) {
        self.history.clear();
        self.switch(GameState::Lobby);
    }

    fn switch(&mut self, next: GameState) {
        let from = self.current;
        self.current = next;
        tracing::info!(%from, to = %next, "game state changed");
        for listener in &self.listeners {
            listener(from, next);
        }
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StateManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateManager")
            .field("current", &self.current)
            .field("history", &self.history)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
