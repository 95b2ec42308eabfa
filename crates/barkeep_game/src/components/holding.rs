//! Item and furniture holding.
//!
//! Only the holder's forward link ([`CanHoldItem::held_item`]) is persisted.
//! The inverse link on [`IsItem`] is runtime-only and is re-applied from the
//! holder after a snapshot is restored.

use barkeep_ecs::{EntityId, EntityStore};
use serde::{Deserialize, Serialize};

/// What kind of holder has an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HeldBy {
    /// Holder type was never configured.
    #[default]
    Unknown,
    /// A player's hands.
    Player,
    /// A customer's hands.
    Customer,
    /// A table, counter or other furniture.
    Furniture,
    /// The in-game store's display.
    Store,
}

/// Marks an entity as something that can be picked up.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IsItem {
    /// Holder kinds allowed to take this item. Empty means any.
    pub allowed_holders: Vec<HeldBy>,
    #[serde(skip)]
    held_by: HeldBy,
    #[serde(skip)]
    holder: Option<EntityId>,
}

impl IsItem {
    /// Restricts which holder kinds may take the item.
    #[must_use]
    pub fn only_held_by(mut self, holders: &[HeldBy]) -> Self {
        self.allowed_holders = holders.to_vec();
        self
    }

    /// Returns `true` if a holder of this kind may take the item.
    #[must_use]
    pub fn can_be_held_by(&self, held_by: HeldBy) -> bool {
        self.allowed_holders.is_empty() || self.allowed_holders.contains(&held_by)
    }

    /// Returns `true` while something holds the item.
    #[must_use]
    pub fn is_held(&self) -> bool {
        self.holder.is_some()
    }

    /// Kind of the current holder.
    #[must_use]
    pub fn held_by(&self) -> HeldBy {
        self.held_by
    }

    /// ID of the current holder.
    #[must_use]
    pub fn holder(&self) -> Option<EntityId> {
        self.holder
    }

    /// Records the holder.
    pub fn set_held_by(&mut self, held_by: HeldBy, holder: EntityId) {
        self.held_by = held_by;
        self.holder = Some(holder);
    }

    /// Forgets the holder.
    pub fn clear_held_by(&mut self) {
        self.held_by = HeldBy::Unknown;
        self.holder = None;
    }
}

/// Lets an entity hold one item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanHoldItem {
    held_item: Option<EntityId>,
    held_by: HeldBy,
}

impl CanHoldItem {
    /// Creates an empty holder of the given kind.
    #[must_use]
    pub fn new(held_by: HeldBy) -> Self {
        Self {
            held_item: None,
            held_by,
        }
    }

    /// Returns `true` when nothing is held.
    #[must_use]
    pub fn empty(&self) -> bool {
        self.held_item.is_none()
    }

    /// Returns `true` when an item is held.
    #[must_use]
    pub fn is_holding_item(&self) -> bool {
        self.held_item.is_some()
    }

    /// ID of the held item.
    #[must_use]
    pub fn item_id(&self) -> Option<EntityId> {
        self.held_item
    }

    /// Holder kind stamped onto items this holder takes.
    #[must_use]
    pub fn hb_type(&self) -> HeldBy {
        self.held_by
    }

    /// Replaces the held item. Only the forward link changes; use
    /// [`give_item`] to keep both sides in sync.
    pub fn update(&mut self, item: Option<EntityId>) {
        if item.is_some() && self.held_by == HeldBy::Unknown {
            tracing::warn!(?item, "holding an item with an unconfigured holder kind");
        }
        self.held_item = item;
    }
}

/// Lets an entity carry one piece of furniture.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanHoldFurniture {
    held_furniture: Option<EntityId>,
}

impl CanHoldFurniture {
    /// Returns `true` when furniture is carried.
    #[must_use]
    pub fn is_holding(&self) -> bool {
        self.held_furniture.is_some()
    }

    /// ID of the carried furniture.
    #[must_use]
    pub fn furniture_id(&self) -> Option<EntityId> {
        self.held_furniture
    }

    /// Replaces the carried furniture.
    pub fn update(&mut self, furniture: Option<EntityId>) {
        self.held_furniture = furniture;
    }
}

component!(IsItem, CanHoldItem, CanHoldFurniture);

/// Moves `item` into `holder`'s hands, updating both sides.
///
/// Returns `false` (and changes nothing) if either entity is missing the
/// needed component, the holder is busy, or the item refuses the holder.
pub fn give_item(store: &mut EntityStore, holder: EntityId, item: EntityId) -> bool {
    let Some(held_by) = store
        .get_by_id(holder)
        .and_then(|e| e.try_get::<CanHoldItem>())
        .filter(|chi| chi.empty())
        .map(CanHoldItem::hb_type)
    else {
        return false;
    };
    let Some(is_item) = store
        .get_by_id_mut(item)
        .and_then(|e| e.try_get_mut::<IsItem>())
    else {
        return false;
    };
    if !is_item.can_be_held_by(held_by) || is_item.is_held() {
        return false;
    }
    is_item.set_held_by(held_by, holder);
    store.get_enforced_mut(holder).get_mut::<CanHoldItem>().update(Some(item));
    true
}

/// Empties `holder`'s hands and returns what it held.
pub fn drop_item(store: &mut EntityStore, holder: EntityId) -> Option<EntityId> {
    let item = store
        .get_by_id_mut(holder)?
        .try_get_mut::<CanHoldItem>()?
        .held_item
        .take()?;
    if let Some(is_item) = store.get_by_id_mut(item).and_then(|e| e.try_get_mut::<IsItem>()) {
        is_item.clear_held_by();
    }
    Some(item)
}

#[cfg(test)]
mod tests {
    use barkeep_ecs::RunMode;

    use super::*;

    fn setup() -> (EntityStore, EntityId, EntityId) {
        let mut store = EntityStore::new(RunMode::Server);
        let holder = {
            let e = store.create();
            e.add(CanHoldItem::new(HeldBy::Customer));
            e.id
        };
        let item = {
            let e = store.create();
            e.add(IsItem::default());
            e.id
        };
        (store, holder, item)
    }

    #[test]
    fn test_give_and_drop_keep_both_sides_in_sync() {
        let (mut store, holder, item) = setup();
        assert!(give_item(&mut store, holder, item));
        assert_eq!(store.get_enforced(holder).get::<CanHoldItem>().item_id(), Some(item));
        let is_item = store.get_enforced(item).get::<IsItem>();
        assert_eq!(is_item.holder(), Some(holder));
        assert_eq!(is_item.held_by(), HeldBy::Customer);

        assert_eq!(drop_item(&mut store, holder), Some(item));
        assert!(store.get_enforced(holder).get::<CanHoldItem>().empty());
        assert!(!store.get_enforced(item).get::<IsItem>().is_held());
    }

    #[test]
    fn test_give_respects_allowed_holders() {
        let (mut store, holder, item) = setup();
        *store.get_enforced_mut(item).get_mut::<IsItem>() =
            IsItem::default().only_held_by(&[HeldBy::Player]);
        assert!(!give_item(&mut store, holder, item));
        assert!(store.get_enforced(holder).get::<CanHoldItem>().empty());
    }

    #[test]
    fn test_held_by_is_not_serialized() {
        let mut item = IsItem::default();
        item.set_held_by(HeldBy::Player, EntityId(4));
        let bytes = rmp_serde::to_vec(&item).unwrap();
        let restored: IsItem = rmp_serde::from_slice(&bytes).unwrap();
        assert!(!restored.is_held());
    }
}
