//! Timed spawners.
//!
//! What a spawner produces is a [`SpawnKind`]; the spawning system looks the
//! kind up in its maker table, so the component stays plain data.

use serde::{Deserialize, Serialize};

/// What a spawner produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SpawnKind {
    /// A customer.
    #[default]
    Customer,
    /// A piece of trash.
    Trash,
}

/// Spawns up to `total` entities, one every `time_between` seconds.
///
/// The first spawn happens one full interval after a reset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IsSpawner {
    kind: SpawnKind,
    max_spawned: i32,
    num_spawned: i32,
    spread: f32,
    countdown: f32,
    prevent_duplicates: bool,
    show_progress: bool,
}

impl IsSpawner {
    /// Creates a spawner of `kind` with nothing to spawn yet.
    #[must_use]
    pub fn new(kind: SpawnKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// What this spawner produces.
    #[must_use]
    pub fn kind(&self) -> SpawnKind {
        self.kind
    }

    /// Sets how many entities to spawn before stopping.
    #[must_use]
    pub fn set_total(mut self, total: i32) -> Self {
        self.max_spawned = total;
        self
    }

    /// Sets the interval between spawns and restarts the countdown.
    #[must_use]
    pub fn set_time_between(mut self, seconds: f32) -> Self {
        self.spread = seconds;
        self.countdown = seconds;
        self
    }

    /// Refuses to spawn onto an occupied spot.
    #[must_use]
    pub fn enable_prevent_duplicates(mut self) -> Self {
        self.prevent_duplicates = true;
        self
    }

    /// Shows a progress bar while counting down.
    #[must_use]
    pub fn enable_show_progress(mut self) -> Self {
        self.show_progress = true;
        self
    }

    /// Changes the total in place.
    pub fn update_total(&mut self, total: i32) {
        self.max_spawned = total;
    }

    /// Returns `true` once `total` entities were spawned.
    #[must_use]
    pub fn hit_max(&self) -> bool {
        self.num_spawned >= self.max_spawned
    }

    /// Entities spawned since the last reset.
    #[must_use]
    pub fn num_spawned(&self) -> i32 {
        self.num_spawned
    }

    /// Configured total.
    #[must_use]
    pub fn max_spawned(&self) -> i32 {
        self.max_spawned
    }

    /// Advances the countdown. Returns `true` when a spawn is due.
    pub fn pass_time(&mut self, dt: f32) -> bool {
        if self.hit_max() {
            return false;
        }
        self.countdown -= dt;
        self.countdown <= 0.0
    }

    /// Keeps a due spawn pending without letting the countdown run further
    /// negative, so a blocked spawner fires once when it clears.
    pub fn hold(&mut self) {
        self.countdown = self.countdown.max(0.0);
    }

    /// Records a spawn and schedules the next one.
    pub fn post_spawn_reset(&mut self) {
        self.num_spawned += 1;
        self.countdown += self.spread;
    }

    /// Starts a new round of spawning.
    pub fn reset_num_spawned(&mut self) {
        self.num_spawned = 0;
        self.countdown = self.spread;
    }

    /// Returns `true` if spawning onto an occupied spot is refused.
    #[must_use]
    pub fn prevent_dupes(&self) -> bool {
        self.prevent_duplicates
    }

    /// Returns `true` if a progress bar should be drawn.
    #[must_use]
    pub fn show_progress(&self) -> bool {
        self.show_progress
    }

    /// Fraction of the current interval still remaining.
    #[must_use]
    pub fn pct(&self) -> f32 {
        if self.spread <= 0.0 {
            0.0
        } else {
            (self.countdown / self.spread).clamp(0.0, 1.0)
        }
    }
}

component!(IsSpawner);
