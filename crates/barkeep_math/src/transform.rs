//! Spatial transform component.
//!
//! The simulation is laid out on the XZ ground plane: `position.x` and
//! `position.z` are grid coordinates, `y` is height. [`Transform::as2`]
//! projects onto that plane.

use std::fmt;

use barkeep_ecs::Component;
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::spatial::{BoundingBox, snap};

/// Which way an entity faces on the ground plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FrontFaceDirection {
    /// +Z.
    #[default]
    Forward,
    /// +X.
    Right,
    /// -Z.
    Back,
    /// -X.
    Left,
}

impl FrontFaceDirection {
    /// Unit offset on the ground plane.
    #[must_use]
    pub const fn offset(self) -> Vec2 {
        match self {
            FrontFaceDirection::Forward => Vec2::new(0.0, 1.0),
            FrontFaceDirection::Right => Vec2::new(1.0, 0.0),
            FrontFaceDirection::Back => Vec2::new(0.0, -1.0),
            FrontFaceDirection::Left => Vec2::new(-1.0, 0.0),
        }
    }

    /// The direction a quarter turn clockwise.
    #[must_use]
    pub const fn rotate_clockwise(self) -> Self {
        match self {
            FrontFaceDirection::Forward => FrontFaceDirection::Right,
            FrontFaceDirection::Right => FrontFaceDirection::Back,
            FrontFaceDirection::Back => FrontFaceDirection::Left,
            FrontFaceDirection::Left => FrontFaceDirection::Forward,
        }
    }

    /// The direction that best points along `delta`. Ties favour the Z axis.
    #[must_use]
    pub fn toward(delta: Vec2) -> Self {
        if delta.x.abs() > delta.y.abs() {
            if delta.x > 0.0 {
                FrontFaceDirection::Right
            } else {
                FrontFaceDirection::Left
            }
        } else if delta.y >= 0.0 {
            FrontFaceDirection::Forward
        } else {
            FrontFaceDirection::Back
        }
    }

    /// Facing angle in degrees, clockwise from +Z.
    #[must_use]
    pub const fn degrees(self) -> f32 {
        match self {
            FrontFaceDirection::Forward => 0.0,
            FrontFaceDirection::Right => 90.0,
            FrontFaceDirection::Back => 180.0,
            FrontFaceDirection::Left => 270.0,
        }
    }
}

impl fmt::Display for FrontFaceDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Position, size and facing of an entity.
///
/// Nearly every placed entity carries one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// World-space centre.
    pub position: Vec3,
    /// Extent along each axis.
    pub size: Vec3,
    /// Facing on the ground plane.
    pub facing: FrontFaceDirection,
}

impl Transform {
    /// A unit-sized transform at the origin facing forward.
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        size: Vec3::ONE,
        facing: FrontFaceDirection::Forward,
    };

    /// Creates a unit-sized transform at `position`.
    #[must_use]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    /// Creates a transform with an explicit size.
    #[must_use]
    pub fn new(position: Vec3, size: Vec3) -> Self {
        Self {
            position,
            size,
            facing: FrontFaceDirection::Forward,
        }
    }

    /// Ground-plane position `(x, z)`.
    #[must_use]
    pub fn as2(&self) -> Vec2 {
        Vec2::new(self.position.x, self.position.z)
    }

    /// Ground-plane position snapped to the grid.
    #[must_use]
    pub fn snapped(&self) -> Vec2 {
        snap(self.as2())
    }

    /// Axis-aligned bounds centred on the position.
    #[must_use]
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::from_center_size(self.position, self.size)
    }

    /// Grid cell `distance` tiles in front of this transform.
    #[must_use]
    pub fn tile_infront(&self, distance: i32) -> Vec2 {
        snap(self.as2()) + self.facing.offset() * distance as f32
    }

    /// Moves to a ground-plane position, keeping the height.
    pub fn update_xz(&mut self, pos: Vec2) {
        self.position.x = pos.x;
        self.position.z = pos.y;
    }

    /// Turns to face a ground-plane point. No-op when already on it.
    pub fn turn_to_face(&mut self, target: Vec2) {
        let delta = target - self.as2();
        if delta.length_squared() > f32::EPSILON {
            self.facing = FrontFaceDirection::toward(delta);
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Component for Transform {
    fn type_name() -> &'static str {
        "Transform"
    }
}
