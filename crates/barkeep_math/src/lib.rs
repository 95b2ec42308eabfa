//! # barkeep_math
//!
//! Spatial types for the bar simulation. Re-exports [`glam`] for linear
//! algebra and defines the [`Transform`] component plus ground-plane helpers.

pub mod spatial;
pub mod transform;

pub use glam::{Vec2, Vec3};

pub use spatial::{BoundingBox, Rectangle, distance, snap, to_cell, within_range};
pub use transform::{FrontFaceDirection, Transform};
