//! Gameplay components.
//!
//! Every component here is plain data with serde derives; cross-entity links
//! are stored as [`EntityId`](barkeep_ecs::EntityId)s, never as references.

macro_rules! component {
    ($($ty:ident),+ $(,)?) => {
        $(
            impl barkeep_ecs::Component for $ty {
                fn type_name() -> &'static str {
                    stringify!($ty)
                }
            }
        )+
    };
}

pub mod ai;
pub mod basic;
pub mod day_night;
pub mod drink;
pub mod holding;
pub mod queue;
pub mod render;
pub mod spawner;

pub use ai::{AiAbilities, AiState, AiWaitInQueue, CanPathfind, IsAiControlled};
pub use basic::{HasName, IsBank, IsSolid, IsStoreSpawned, IsToilet};
pub use day_night::{DayNightHook, HasDayNightTimer, RespondsToDayNight};
pub use drink::{Drink, Ingredient, IsDrink};
pub use holding::{CanHoldFurniture, CanHoldItem, HeldBy, IsItem};
pub use queue::{HasWaitingQueue, MAX_QUEUE_SIZE};
pub use render::{Color, ModelRenderer, SimpleColoredBoxRenderer};
pub use spawner::{IsSpawner, SpawnKind};
