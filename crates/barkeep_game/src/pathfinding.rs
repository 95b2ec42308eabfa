//! Pathfinding collaborator.
//!
//! Systems only see the [`Pathfinder`] trait. [`GridBfs`] is the default
//! implementation: a bounded breadth-first search over 4-connected grid
//! cells.

use std::collections::{HashMap, VecDeque};

use barkeep_ecs::EntityStore;
use barkeep_math::{Vec2, to_cell};

use crate::components::IsSolid;
use crate::query::{GameQueryExt, query};

/// Finds a walkable route between two ground-plane positions.
pub trait Pathfinder: Send + Sync {
    /// Returns the waypoints from `start` (exclusive) to `end` (inclusive),
    /// or an empty path if `end` is unreachable. `end` itself is allowed to
    /// be blocked so entities can walk up to furniture.
    fn find_path(&self, start: Vec2, end: Vec2, is_walkable: &dyn Fn(Vec2) -> bool) -> Vec<Vec2>;
}

/// Bounded 4-neighbour breadth-first search.
#[derive(Debug, Clone, Copy)]
pub struct GridBfs {
    /// Maximum cells visited before giving up.
    pub max_nodes: usize,
}

impl Default for GridBfs {
    fn default() -> Self {
        Self { max_nodes: 10_000 }
    }
}

impl GridBfs {
    const NEIGHBOURS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
}

impl Pathfinder for GridBfs {
    fn find_path(&self, start: Vec2, end: Vec2, is_walkable: &dyn Fn(Vec2) -> bool) -> Vec<Vec2> {
        let start = to_cell(start);
        let goal = to_cell(end);
        if start == goal {
            return Vec::new();
        }
        let cell_pos = |(x, z): (i32, i32)| Vec2::new(x as f32, z as f32);

        let mut came_from: HashMap<(i32, i32), (i32, i32)> = HashMap::new();
        let mut frontier = VecDeque::from([start]);
        came_from.insert(start, start);

        while let Some(current) = frontier.pop_front() {
            if current == goal {
                let mut path = vec![cell_pos(current)];
                let mut at = current;
                while let Some(&prev) = came_from.get(&at) {
                    if prev == start {
                        break;
                    }
                    path.push(cell_pos(prev));
                    at = prev;
                }
                path.reverse();
                return path;
            }
            if came_from.len() >= self.max_nodes {
                tracing::debug!(?start, ?goal, visited = came_from.len(), "path search gave up");
                break;
            }
            for (dx, dz) in Self::NEIGHBOURS {
                let next = (current.0 + dx, current.1 + dz);
                if came_from.contains_key(&next) {
                    continue;
                }
                if next != goal && !is_walkable(cell_pos(next)) {
                    continue;
                }
                came_from.insert(next, current);
                frontier.push_back(next);
            }
        }
        Vec::new()
    }
}

/// Returns `true` if no solid entity occupies the grid cell at `pos`.
///
/// Memoised per cell in the store's walkability cache.
#[must_use]
pub fn is_walkable(store: &EntityStore, pos: Vec2) -> bool {
    store.cached_walkable(to_cell(pos), |store| {
        !query(store)
            .include_store_entities()
            .where_has::<IsSolid>()
            .where_snapped_position_matches(pos)
            .has_values()
    })
}

#[cfg(test)]
mod tests {
    use barkeep_ecs::RunMode;
    use barkeep_math::{Transform, Vec3};

    use super::*;

    #[test]
    fn test_straight_line() {
        let path = GridBfs::default().find_path(Vec2::ZERO, Vec2::new(3.0, 0.0), &|_| true);
        assert_eq!(
            path,
            vec![Vec2::new(1.0, 0.0), Vec2::new(2.0, 0.0), Vec2::new(3.0, 0.0)]
        );
    }

    #[test]
    fn test_routes_around_walls() {
        let open = |p: Vec2| !(p.x == 1.0 && p.y.abs() < 1.5);
        let path = GridBfs::default().find_path(Vec2::ZERO, Vec2::new(2.0, 0.0), &open);
        assert_eq!(path.last(), Some(&Vec2::new(2.0, 0.0)));
        assert!(path.iter().all(|p| open(*p)));
        assert_eq!(path.len(), 6);
    }

    #[test]
    fn test_unreachable_gives_empty_path() {
        let pf = GridBfs { max_nodes: 50 };
        let path = pf.find_path(Vec2::ZERO, Vec2::new(5.0, 0.0), &|p| p.x < 2.0);
        assert!(path.is_empty());
    }

    #[test]
    fn test_is_walkable_checks_solids() {
        let mut store = EntityStore::new(RunMode::Server);
        let wall = store.create();
        wall.add(Transform::from_position(Vec3::new(2.0, 0.0, 1.0)));
        wall.add(IsSolid);
        assert!(!is_walkable(&store, Vec2::new(2.2, 0.9)));
        assert!(is_walkable(&store, Vec2::new(1.0, 1.0)));
    }
}
