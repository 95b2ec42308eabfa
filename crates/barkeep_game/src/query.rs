//! Gameplay query predicates.
//!
//! [`query`] is the entry point gameplay code uses: it starts an
//! [`EntityQuery`] that skips entities spawned by the in-game store until
//! [`GameQueryExt::include_store_entities`] is called. The spatial and
//! holding predicates are provided by the [`GameQueryExt`] extension trait
//! so the generic query engine stays free of gameplay types.

use barkeep_ecs::{Entity, EntityId, EntityQuery, EntityStore, EntityType, Modification};
use barkeep_math::{
    BoundingBox, FrontFaceDirection, Rectangle, Transform, Vec2, snap, to_cell, within_range,
};

use crate::components::{CanHoldFurniture, CanHoldItem, Drink, IsDrink, IsItem, IsStoreSpawned};
use crate::pathfinding::{Pathfinder, is_walkable};

/// Starts a gameplay query over `store`. Store-spawned entities are hidden.
#[must_use]
pub fn query(store: &EntityStore) -> EntityQuery<'_> {
    EntityQuery::new(store).hide::<IsStoreSpawned>()
}

fn position_of(entity: &Entity) -> Option<Vec2> {
    entity.try_get::<Transform>().map(Transform::as2)
}

/// Spatial and domain predicates on top of [`EntityQuery`].
pub trait GameQueryExt<'a>: Sized {
    /// Makes store-spawned entities visible to this query.
    #[must_use]
    fn include_store_entities(self) -> Self;

    /// Keeps entities within `range` of `pos`.
    #[must_use]
    fn where_in_range(self, pos: Vec2, range: f32) -> Self;

    /// Drops entities within `range` of `pos`. Entities without a
    /// transform are kept.
    #[must_use]
    fn where_not_in_range(self, pos: Vec2, range: f32) -> Self;

    /// Like [`GameQueryExt::where_in_range`] with both sides snapped to
    /// the grid first.
    #[must_use]
    fn where_in_range_snapped(self, pos: Vec2, range: f32) -> Self;

    /// Keeps entities exactly at `pos`.
    #[must_use]
    fn where_position_matches(self, pos: Vec2) -> Self;

    /// Keeps entities in the same grid cell as `pos`.
    #[must_use]
    fn where_snapped_position_matches(self, pos: Vec2) -> Self;

    /// Keeps entities strictly ahead of `origin` along `facing`, at most
    /// `reach` tiles away, on the same grid line.
    #[must_use]
    fn where_in_front_of(self, origin: Vec2, facing: FrontFaceDirection, reach: f32) -> Self;

    /// Keeps entities whose position lies inside `rect`.
    #[must_use]
    fn where_inside(self, rect: Rectangle) -> Self;

    /// Keeps positioned entities outside `rect`.
    #[must_use]
    fn where_not_inside(self, rect: Rectangle) -> Self;

    /// Keeps entities whose bounds overlap `bounds`.
    #[must_use]
    fn where_collides_with(self, bounds: BoundingBox) -> Self;

    /// Keeps entities holding any item.
    #[must_use]
    fn where_is_holding_any_item(self) -> Self;

    /// Keeps entities holding an item of `entity_type`.
    #[must_use]
    fn where_is_holding_item_of_type(self, entity_type: EntityType) -> Self;

    /// Keeps entities carrying the furniture with this ID.
    #[must_use]
    fn where_holding_furniture_id(self, furniture: EntityId) -> Self;

    /// Keeps entities carrying any furniture.
    #[must_use]
    fn where_is_holding_any_furniture(self) -> Self;

    /// Keeps entities whose held item satisfies `f`.
    #[must_use]
    fn where_held_item_matches(self, f: impl Fn(&Entity) -> bool + 'a) -> Self;

    /// Keeps items nobody holds. Entities that are not items are kept.
    #[must_use]
    fn where_is_not_being_held(self) -> Self;

    /// Keeps drinks whose ingredients make `drink`.
    #[must_use]
    fn where_drink_matches_recipe(self, drink: Drink) -> Self;

    /// Keeps entities that can walk to `target`.
    #[must_use]
    fn where_can_pathfind_to(self, target: Vec2, pathfinder: &'a dyn Pathfinder) -> Self;

    /// Orders results nearest to `pos` first. Entities without a transform
    /// sort last.
    #[must_use]
    fn order_by_dist(self, pos: Vec2) -> Self;

    /// Ground-plane positions of every match that has a transform.
    #[must_use]
    fn gen_positions(&self) -> Vec<Vec2>;

    /// Ground-plane position of the first match.
    #[must_use]
    fn gen_first_position(&self) -> Option<Vec2>;
}

impl<'a> GameQueryExt<'a> for EntityQuery<'a> {
    fn include_store_entities(self) -> Self {
        self.reveal::<IsStoreSpawned>()
    }

    fn where_in_range(self, pos: Vec2, range: f32) -> Self {
        self.add_mod(Modification::new("where_in_range", move |e| {
            position_of(e).is_some_and(|p| within_range(p, pos, range, false))
        }))
    }

    fn where_not_in_range(self, pos: Vec2, range: f32) -> Self {
        self.add_mod(Modification::new("where_not_in_range", move |e| {
            position_of(e).is_none_or(|p| !within_range(p, pos, range, false))
        }))
    }

    fn where_in_range_snapped(self, pos: Vec2, range: f32) -> Self {
        self.add_mod(Modification::new("where_in_range_snapped", move |e| {
            position_of(e).is_some_and(|p| within_range(p, pos, range, true))
        }))
    }

    fn where_position_matches(self, pos: Vec2) -> Self {
        self.add_mod(Modification::new("where_position_matches", move |e| {
            position_of(e).is_some_and(|p| p.distance_squared(pos) <= f32::EPSILON)
        }))
    }

    fn where_snapped_position_matches(self, pos: Vec2) -> Self {
        let cell = to_cell(pos);
        self.add_mod(Modification::new("where_snapped_position_matches", move |e| {
            position_of(e).is_some_and(|p| to_cell(p) == cell)
        }))
    }

    fn where_in_front_of(self, origin: Vec2, facing: FrontFaceDirection, reach: f32) -> Self {
        let origin = snap(origin);
        let dir = facing.offset();
        self.add_mod(Modification::new("where_in_front_of", move |e| {
            let Some(p) = position_of(e) else {
                return false;
            };
            let delta = snap(p) - origin;
            let ahead = delta.dot(dir);
            let across = delta.perp_dot(dir);
            ahead > 0.0 && ahead <= reach && across.abs() < 0.5
        }))
    }

    fn where_inside(self, rect: Rectangle) -> Self {
        self.add_mod(Modification::new("where_inside", move |e| {
            position_of(e).is_some_and(|p| rect.contains(p))
        }))
    }

    fn where_not_inside(self, rect: Rectangle) -> Self {
        self.add_mod(Modification::new("where_not_inside", move |e| {
            position_of(e).is_some_and(|p| !rect.contains(p))
        }))
    }

    fn where_collides_with(self, bounds: BoundingBox) -> Self {
        self.add_mod(Modification::new("where_collides_with", move |e| {
            e.try_get::<Transform>()
                .is_some_and(|t| t.bounds().collides(&bounds))
        }))
    }

    fn where_is_holding_any_item(self) -> Self {
        self.where_has_and::<CanHoldItem>(CanHoldItem::is_holding_item)
    }

    fn where_is_holding_item_of_type(self, entity_type: EntityType) -> Self {
        self.where_held_item_matches(move |item| item.entity_type == entity_type)
    }

    fn where_holding_furniture_id(self, furniture: EntityId) -> Self {
        self.where_has_and::<CanHoldFurniture>(move |chf| chf.furniture_id() == Some(furniture))
    }

    fn where_is_holding_any_furniture(self) -> Self {
        self.where_has_and::<CanHoldFurniture>(CanHoldFurniture::is_holding)
    }

    fn where_held_item_matches(self, f: impl Fn(&Entity) -> bool + 'a) -> Self {
        let store = self.store();
        self.add_mod(Modification::new("where_held_item_matches", move |e| {
            e.try_get::<CanHoldItem>()
                .and_then(CanHoldItem::item_id)
                .and_then(|id| store.get_by_id(id))
                .is_some_and(&f)
        }))
    }

    fn where_is_not_being_held(self) -> Self {
        self.where_if_has::<IsItem>(|item| !item.is_held())
    }

    fn where_drink_matches_recipe(self, drink: Drink) -> Self {
        self.where_has_and::<IsDrink>(move |d| d.matches_recipe(drink))
    }

    fn where_can_pathfind_to(self, target: Vec2, pathfinder: &'a dyn Pathfinder) -> Self {
        let store = self.store();
        self.add_mod(Modification::new("where_can_pathfind_to", move |e| {
            let Some(start) = position_of(e) else {
                return false;
            };
            if to_cell(start) == to_cell(target) {
                return true;
            }
            let walkable = |p: Vec2| is_walkable(store, p);
            !pathfinder.find_path(start, target, &walkable).is_empty()
        }))
    }

    fn order_by_dist(self, pos: Vec2) -> Self {
        self.order_by("order_by_dist", move |a, b| {
            let da = position_of(a).map_or(f32::INFINITY, |p| p.distance_squared(pos));
            let db = position_of(b).map_or(f32::INFINITY, |p| p.distance_squared(pos));
            da.total_cmp(&db)
        })
    }

    fn gen_positions(&self) -> Vec<Vec2> {
        self.gen_all().into_iter().filter_map(position_of).collect()
    }

    fn gen_first_position(&self) -> Option<Vec2> {
        self.gen_first().and_then(position_of)
    }
}
