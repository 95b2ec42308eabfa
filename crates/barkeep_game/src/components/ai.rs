//! AI behaviour state and pathfinding.
//!
//! Behaviour is a small finite state machine per entity. Systems stage a
//! transition with [`IsAiControlled::set_next_state`]; the commit system
//! applies staged transitions once per tick.

use std::collections::VecDeque;

use barkeep_ecs::EntityId;
use barkeep_math::Vec2;
use serde::{Deserialize, Serialize};

/// What a customer is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AiState {
    /// Idle, waiting for the bar to open.
    #[default]
    Wander,
    /// Walking to and standing in a register line.
    QueueForRegister,
    /// At the front of the line, waiting to be served.
    AtRegisterWaitForDrink,
    /// Drinking.
    Drinking,
    /// Using the toilet.
    Bathroom,
    /// Paying for the drink.
    Pay,
    /// Playing the jukebox.
    PlayJukebox,
    /// Mopping up vomit.
    CleanVomit,
    /// Walking out.
    Leave,
}

/// Optional behaviours a customer may have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AiAbilities(u32);

impl AiAbilities {
    /// No optional behaviours.
    pub const NONE: Self = Self(0);
    /// May clean up vomit.
    pub const CLEAN_VOMIT: Self = Self(1 << 0);
    /// May use the toilet.
    pub const USE_BATHROOM: Self = Self(1 << 1);
    /// May play the jukebox.
    pub const PLAY_JUKEBOX: Self = Self(1 << 2);

    /// Returns `true` if every bit of `flag` is set.
    #[must_use]
    pub const fn contains(self, flag: Self) -> bool {
        self.0 & flag.0 == flag.0
    }

    /// Returns a copy with `flag` set or cleared.
    #[must_use]
    pub const fn with(self, flag: Self, enabled: bool) -> Self {
        if enabled {
            Self(self.0 | flag.0)
        } else {
            Self(self.0 & !flag.0)
        }
    }
}

/// Marks an entity as driven by the AI state machine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IsAiControlled {
    /// Current state.
    pub state: AiState,
    next_state: Option<AiState>,
    /// Optional behaviours.
    pub abilities: AiAbilities,
    /// State to return to after an interruption.
    pub resume_state: AiState,
}

impl IsAiControlled {
    /// Creates an AI starting in `state`.
    #[must_use]
    pub fn new(state: AiState) -> Self {
        Self {
            state,
            ..Self::default()
        }
    }

    /// Enables or disables an ability.
    #[must_use]
    pub fn with_ability(mut self, flag: AiAbilities, enabled: bool) -> Self {
        self.abilities = self.abilities.with(flag, enabled);
        self
    }

    /// Returns `true` if the ability is enabled.
    #[must_use]
    pub fn has_ability(&self, flag: AiAbilities) -> bool {
        self.abilities.contains(flag)
    }

    /// Stages a transition. Returns `false` if one is already staged this
    /// tick; the first request wins.
    pub fn set_next_state(&mut self, state: AiState) -> bool {
        if self.next_state.is_some() {
            return false;
        }
        self.next_state = Some(state);
        true
    }

    /// Stages a transition, replacing any already staged.
    pub fn force_next_state(&mut self, state: AiState) {
        self.next_state = Some(state);
    }

    /// Returns `true` if a transition is staged.
    #[must_use]
    pub fn has_next_state(&self) -> bool {
        self.next_state.is_some()
    }

    /// The staged transition.
    #[must_use]
    pub fn next_state(&self) -> Option<AiState> {
        self.next_state
    }

    /// Applies the staged transition. Returns the new state if one was
    /// staged.
    pub fn commit_next_state(&mut self) -> Option<AiState> {
        let next = self.next_state.take()?;
        self.state = next;
        Some(next)
    }
}

/// The register line a customer chose.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiWaitInQueue {
    /// Register entity whose line the customer joined.
    pub register: Option<EntityId>,
}

/// Movement along a computed path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanPathfind {
    /// The owning entity. Re-derived after a snapshot restore.
    pub parent: EntityId,
    path: VecDeque<Vec2>,
    local_target: Option<Vec2>,
    global_target: Option<Vec2>,
    max_path_length: usize,
}

impl CanPathfind {
    /// Distance below which a position counts as reached.
    pub const ARRIVAL_RADIUS: f32 = 0.5;

    /// Creates an idle pathfinder for `parent`.
    #[must_use]
    pub fn new(parent: EntityId) -> Self {
        Self {
            parent,
            ..Self::default()
        }
    }

    /// Returns `true` when no waypoints remain.
    #[must_use]
    pub fn is_path_empty(&self) -> bool {
        self.path.is_empty() && self.local_target.is_none()
    }

    /// Where the entity is ultimately heading.
    #[must_use]
    pub fn global_target(&self) -> Option<Vec2> {
        self.global_target
    }

    /// Remaining waypoints.
    pub fn path(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.local_target.into_iter().chain(self.path.iter().copied())
    }

    /// Longest path received so far.
    #[must_use]
    pub fn max_path_length(&self) -> usize {
        self.max_path_length
    }

    /// Replaces the path toward `target`.
    pub fn update_path(&mut self, target: Vec2, path: Vec<Vec2>) {
        tracing::trace!(entity = %self.parent, len = path.len(), "received path");
        self.max_path_length = self.max_path_length.max(path.len());
        self.path = path.into();
        self.local_target = None;
        self.global_target = Some(target);
    }

    /// Returns `true` if the current path leads somewhere other than
    /// `target`.
    #[must_use]
    pub fn needs_path_to(&self, target: Vec2) -> bool {
        self.is_path_empty() || self.global_target != Some(target)
    }

    /// Drops the path.
    pub fn clear(&mut self) {
        self.path.clear();
        self.local_target = None;
        self.global_target = None;
    }

    /// The waypoint to walk toward from `position`, advancing past any
    /// already reached.
    pub fn next_waypoint(&mut self, position: Vec2) -> Option<Vec2> {
        loop {
            match self.local_target {
                Some(target) if position.distance(target) >= Self::ARRIVAL_RADIUS => {
                    return Some(target);
                }
                _ => {
                    self.local_target = self.path.pop_front();
                    self.local_target?;
                }
            }
        }
    }
}

component!(IsAiControlled, AiWaitInQueue, CanPathfind);
