//! Stand-in for the player in headless runs.

use barkeep_ecs::OnceSystem;
use barkeep_game::{GameState, GameWorld};
use tracing::{info, warn};

/// Skips the player-driven screens: leaves `Progression` for the store and
/// the store for the next day as soon as they are entered.
#[derive(Debug, Default)]
pub struct Autopilot;

impl OnceSystem<GameWorld> for Autopilot {
    fn name(&self) -> &'static str {
        "autopilot"
    }

    fn should_run(&self, world: &GameWorld, _dt: f32) -> bool {
        matches!(world.state(), GameState::Progression | GameState::Store)
    }

    fn once(&mut self, world: &mut GameWorld, _dt: f32) {
        let result = match world.state() {
            GameState::Progression => world.finish_progression(),
            GameState::Store => world.leave_store(),
            _ => return,
        };
        match result {
            Ok(()) => info!(state = ?world.state(), "autopilot advanced"),
            Err(e) => warn!(%e, "autopilot could not advance"),
        }
    }
}
