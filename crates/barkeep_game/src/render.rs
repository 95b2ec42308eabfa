//! Frame output.
//!
//! The simulation does not draw anything itself. Render systems read the
//! world and append [`DrawCommand`]s to a [`DrawList`] that an external
//! renderer consumes.

use barkeep_ecs::{EntityId, RenderSystem};
use barkeep_math::{Transform, Vec3};
use serde::{Deserialize, Serialize};

use crate::components::{Color, IsSpawner, ModelRenderer, SimpleColoredBoxRenderer};
use crate::world::GameWorld;

/// One thing to draw this frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DrawCommand {
    /// A box with a distinct front face.
    ColoredBox {
        entity: EntityId,
        position: Vec3,
        size: Vec3,
        facing_degrees: f32,
        face: Color,
        base: Color,
    },
    /// A named model.
    Model {
        entity: EntityId,
        position: Vec3,
        size: Vec3,
        facing_degrees: f32,
        model_name: String,
    },
    /// Progress bar over a spawner.
    SpawnerProgress {
        entity: EntityId,
        position: Vec3,
        pct: f32,
    },
    /// The round clock.
    RoundTimer { is_day: bool, pct: f32, day: i32 },
}

/// Commands collected for one frame.
#[derive(Debug, Clone, Default)]
pub struct DrawList {
    commands: Vec<DrawCommand>,
}

impl DrawList {
    /// Appends a command.
    pub fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    /// The commands in submission order.
    #[must_use]
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Drops everything collected so far.
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Number of commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns `true` if nothing was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Rebuilds the draw list from every visible entity.
///
/// A [`ModelRenderer`] wins over a [`SimpleColoredBoxRenderer`] when an
/// entity has both.
#[derive(Debug, Default)]
pub struct CollectDrawCommands;

impl RenderSystem<GameWorld, DrawList> for CollectDrawCommands {
    fn name(&self) -> &'static str {
        "collect_draw_commands"
    }

    fn render(&mut self, world: &GameWorld, frame: &mut DrawList, _dt: f32) {
        frame.clear();
        for entity in world.entities.iter() {
            let Some(transform) = entity.try_get::<Transform>() else {
                continue;
            };
            let facing_degrees = transform.facing.degrees();
            if let Some(model) = entity.try_get::<ModelRenderer>() {
                frame.push(DrawCommand::Model {
                    entity: entity.id,
                    position: transform.position,
                    size: transform.size,
                    facing_degrees,
                    model_name: model.model_name.clone(),
                });
            } else if let Some(colored) = entity.try_get::<SimpleColoredBoxRenderer>() {
                frame.push(DrawCommand::ColoredBox {
                    entity: entity.id,
                    position: transform.position,
                    size: transform.size,
                    facing_degrees,
                    face: colored.face,
                    base: colored.base,
                });
            }
            if let Some(spawner) = entity.try_get::<IsSpawner>() {
                if spawner.show_progress() {
                    frame.push(DrawCommand::SpawnerProgress {
                        entity: entity.id,
                        position: transform.position,
                        pct: spawner.pct(),
                    });
                }
            }
        }
        if let Some(timer) = world.timer() {
            frame.push(DrawCommand::RoundTimer {
                is_day: timer.is_bar_closed(),
                pct: timer.pct(),
                day: timer.days_passed(),
            });
        }
    }
}
