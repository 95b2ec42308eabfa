//! Fixed-timestep tick loop.
//!
//! Each tick runs the update systems in registration order, then the render
//! systems into the frame's [`DrawList`], then sweeps entities marked for
//! cleanup.

use std::time::{Duration, Instant};

use barkeep_game::{DrawList, GameSystems, GameWorld};
use tracing::{debug, info, warn};

/// Configuration for the tick loop.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Target ticks per second.
    pub tick_rate: f64,
    /// Maximum number of ticks to run (0 = unlimited).
    pub max_ticks: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            max_ticks: 0,
        }
    }
}

impl TickConfig {
    /// Seconds per tick.
    #[must_use]
    pub fn dt(&self) -> f32 {
        (1.0 / self.tick_rate) as f32
    }

    fn done(&self, ticks: u64) -> bool {
        self.max_ticks > 0 && ticks >= self.max_ticks
    }
}

/// Owns the world and systems and drives them.
#[derive(Debug)]
pub struct TickLoop {
    tick_id: u64,
    config: TickConfig,
    world: GameWorld,
    systems: GameSystems,
    frame: DrawList,
}

impl TickLoop {
    /// Creates a loop around an already populated world.
    #[must_use]
    pub fn new(config: TickConfig, world: GameWorld, systems: GameSystems) -> Self {
        Self {
            tick_id: 0,
            config,
            world,
            systems,
            frame: DrawList::default(),
        }
    }

    /// Returns the current tick counter.
    #[must_use]
    pub fn tick_id(&self) -> u64 {
        self.tick_id
    }

    /// Returns a reference to the world.
    #[must_use]
    pub fn world(&self) -> &GameWorld {
        &self.world
    }

    /// The last frame's draw commands.
    #[must_use]
    pub fn frame(&self) -> &DrawList {
        &self.frame
    }

    /// Runs one tick.
    pub fn tick(&mut self, dt: f32) {
        self.tick_id += 1;
        let swept = self.systems.tick(&mut self.world, &mut self.frame, dt);
        debug!(
            tick_id = self.tick_id,
            dt,
            state = ?self.world.state(),
            entities = self.world.entities.len(),
            swept = swept.len(),
            draws = self.frame.len(),
            "tick"
        );
    }

    /// Runs the configured number of ticks as fast as possible.
    pub fn run_unpaced(&mut self) {
        let dt = self.config.dt();
        while !self.config.done(self.tick_id) {
            self.tick(dt);
        }
        info!(ticks = self.tick_id, "tick loop complete");
    }

    /// Runs at the configured rate until `max_ticks` is reached or the
    /// process receives Ctrl-C.
    pub async fn run_async(&mut self) {
        let tick_duration = Duration::from_secs_f64(1.0 / self.config.tick_rate);
        let mut interval = tokio::time::interval(tick_duration);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        info!(
            tick_rate = self.config.tick_rate,
            max_ticks = self.config.max_ticks,
            "starting tick loop"
        );

        let dt = self.config.dt();
        loop {
            tokio::select! {
                _ = interval.tick() => {}
                result = &mut shutdown => {
                    if let Err(e) = result {
                        warn!(%e, "failed to listen for ctrl-c");
                    }
                    info!(ticks = self.tick_id, "shutdown requested");
                    break;
                }
            }

            let start = Instant::now();
            self.tick(dt);
            if self.config.done(self.tick_id) {
                info!(ticks = self.tick_id, "tick loop complete");
                break;
            }

            let elapsed = start.elapsed();
            if elapsed > tick_duration {
                warn!(
                    tick_id = self.tick_id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    budget_ms = tick_duration.as_millis() as u64,
                    "tick exceeded time budget"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use barkeep_ecs::RunMode;
    use barkeep_game::systems::register_all;
    use barkeep_game::{GameConfig, GameState};

    use super::*;

    fn tick_loop(max_ticks: u64) -> TickLoop {
        let world = GameWorld::new(RunMode::Server, GameConfig::default());
        let config = TickConfig {
            tick_rate: 1000.0,
            max_ticks,
        };
        TickLoop::new(config, world, register_all())
    }

    #[test]
    fn test_tick_advances_counter() {
        let mut tick_loop = tick_loop(0);
        assert_eq!(tick_loop.tick_id(), 0);
        tick_loop.tick(1.0 / 60.0);
        assert_eq!(tick_loop.tick_id(), 1);
        tick_loop.tick(1.0 / 60.0);
        assert_eq!(tick_loop.tick_id(), 2);
    }

    #[test]
    fn test_run_limited_ticks() {
        let mut tick_loop = tick_loop(5);
        tick_loop.run_unpaced();
        assert_eq!(tick_loop.tick_id(), 5);
        assert!(tick_loop.frame().is_empty());
        assert_eq!(tick_loop.world().state(), GameState::Lobby);
    }

    #[tokio::test]
    async fn test_run_async_stops_at_max_ticks() {
        let mut tick_loop = tick_loop(3);
        tick_loop.run_async().await;
        assert_eq!(tick_loop.tick_id(), 3);
    }
}
