//! Grid snapping, distances and simple shapes on the ground plane.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Rounds a ground-plane position to the nearest grid cell.
#[must_use]
pub fn snap(pos: Vec2) -> Vec2 {
    pos.round()
}

/// Snapped position as integer grid coordinates.
#[must_use]
pub fn to_cell(pos: Vec2) -> (i32, i32) {
    let snapped = snap(pos);
    (snapped.x as i32, snapped.y as i32)
}

/// Euclidean distance between two ground-plane positions.
#[must_use]
pub fn distance(a: Vec2, b: Vec2) -> f32 {
    a.distance(b)
}

/// Returns `true` if `a` and `b` are within `range` of each other.
/// With `snapped`, both are rounded to the grid first.
#[must_use]
pub fn within_range(a: Vec2, b: Vec2, range: f32, snapped: bool) -> bool {
    let (a, b) = if snapped { (snap(a), snap(b)) } else { (a, b) };
    a.distance_squared(b) <= range * range
}

/// Axis-aligned box in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl BoundingBox {
    /// Builds a box from its centre and full extent.
    #[must_use]
    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Returns `true` if the two boxes overlap. Touching faces do not count.
    #[must_use]
    pub fn collides(&self, other: &BoundingBox) -> bool {
        self.min.cmplt(other.max).all() && other.min.cmplt(self.max).all()
    }

    /// Returns `true` if `point` lies inside or on the box.
    #[must_use]
    pub fn contains(&self, point: Vec3) -> bool {
        self.min.cmple(point).all() && point.cmple(self.max).all()
    }
}

/// Axis-aligned rectangle on the ground plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    /// Minimum corner `(x, z)`.
    pub origin: Vec2,
    /// Width along X and depth along Z.
    pub size: Vec2,
}

impl Rectangle {
    /// Creates a rectangle.
    #[must_use]
    pub fn new(origin: Vec2, size: Vec2) -> Self {
        Self { origin, size }
    }

    /// Returns `true` if `point` lies inside or on the rectangle.
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        let max = self.origin + self.size;
        self.origin.cmple(point).all() && point.cmple(max).all()
    }
}
