//! # barkeep_game
//!
//! Gameplay layer of the bar simulation, built on [`barkeep_ecs`].
//!
//! - [`components`]: every gameplay component.
//! - [`query`]: spatial, holding and drink predicates for [`barkeep_ecs::EntityQuery`].
//! - [`round`]: the top-level [`GameState`] machine.
//! - [`systems`]: round timer, day/night transitions, spawners and customer AI.
//! - [`world`]: the [`GameWorld`] context systems run against.
//! - [`makers`]: entity constructors and the default bar layout.
//! - [`render`]: draw commands for an external renderer.

pub mod components;
pub mod config;
pub mod error;
pub mod makers;
pub mod pathfinding;
pub mod query;
pub mod render;
pub mod round;
pub mod systems;
pub mod world;

pub use config::GameConfig;
pub use error::GameError;
pub use pathfinding::{GridBfs, Pathfinder};
pub use query::{GameQueryExt, query};
pub use render::{DrawCommand, DrawList};
pub use round::{GameState, StateManager};
pub use systems::{GameSystems, register_all};
pub use world::{GameResources, GameWorld};
