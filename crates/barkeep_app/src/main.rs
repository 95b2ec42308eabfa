//! # barkeep
//!
//! Runs the bar simulation without a window: builds or loads a world, then
//! drives the game systems on a fixed timestep.
//!
//! ## Startup Sequence
//!
//! 1. Parse the command line and load the game config.
//! 2. Load a save file, or seed the default bar.
//! 3. Start the game (a loaded save resumes in its timer's phase) and
//!    enter the tick loop.
//! 4. On completion or Ctrl-C, optionally write a save file.

mod autopilot;
mod tick;

use std::path::PathBuf;

use anyhow::{Context, Result};
use barkeep_ecs::RunMode;
use barkeep_game::makers::seed_world;
use barkeep_game::{GameConfig, GameWorld, register_all};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use autopilot::Autopilot;
use tick::{TickConfig, TickLoop};

/// Which entity collection this process simulates.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Server,
    Client,
}

impl From<Mode> for RunMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Server => RunMode::Server,
            Mode::Client => RunMode::Client,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "barkeep", about = "Headless bar simulation")]
struct Args {
    /// Entity collection to simulate
    #[arg(long, value_enum, default_value_t = Mode::Server)]
    mode: Mode,

    /// JSON game config; missing fields use defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Save file to start from
    #[arg(long)]
    load: Option<PathBuf>,

    /// Where to write a save file on exit
    #[arg(long)]
    save: Option<PathBuf>,

    /// Ticks to run (0 = until Ctrl-C)
    #[arg(long, default_value_t = 0)]
    ticks: u64,

    /// Ticks per second
    #[arg(long, default_value_t = 60.0)]
    tick_rate: f64,

    /// Build the default bar layout when no save is loaded
    #[arg(long)]
    seed_world: bool,

    /// Run ticks back to back instead of in real time (needs --ticks)
    #[arg(long)]
    unpaced: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("barkeep=info")),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => GameConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => GameConfig::default(),
    };

    let mut world = GameWorld::new(args.mode.into(), config.clone());
    if let Some(path) = &args.load {
        let report = barkeep_snapshot::load_from_path(&mut world.entities, path)
            .with_context(|| format!("loading save {}", path.display()))?;
        if !report.is_clean() {
            warn!(repairs = report.len(), "save file needed repairs");
        }
        world.resume_from_timer()?;
    } else {
        if args.seed_world {
            seed_world(&mut world.entities, &config);
        } else {
            warn!("starting with an empty world; pass --seed-world or --load");
        }
        world.start_game()?;
    }

    let mut systems = register_all();
    systems.register_once(Autopilot);

    let tick_config = TickConfig {
        tick_rate: args.tick_rate,
        max_ticks: args.ticks,
    };
    info!(mode = ?args.mode, entities = world.entities.len(), "barkeep starting");
    let mut tick_loop = TickLoop::new(tick_config, world, systems);
    if args.unpaced && args.ticks > 0 {
        tick_loop.run_unpaced();
    } else {
        tick_loop.run_async().await;
    }

    if let Some(path) = &args.save {
        barkeep_snapshot::save_to_path(&tick_loop.world().entities, path)
            .with_context(|| format!("writing save {}", path.display()))?;
    }

    info!(
        ticks = tick_loop.tick_id(),
        draws = tick_loop.frame().len(),
        "barkeep shut down"
    );
    Ok(())
}
