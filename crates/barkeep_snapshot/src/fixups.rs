//! Post-restore reference repair.
//!
//! Snapshots store each cross-entity link once, as an ID. After a batch is
//! in the store, [`run_fixups`] re-derives owner back-references, rebuilds
//! the inverse "held by" side of every item from its holder, and clears links whose
//! target no longer exists. Broken links are logged and repaired, never
//! fatal.

use std::collections::{HashMap, HashSet};

use barkeep_ecs::{EntityId, EntityStore};
use barkeep_game::components::{
    AiWaitInQueue, CanHoldFurniture, CanHoldItem, CanPathfind, HasWaitingQueue, HeldBy, IsItem,
    RespondsToDayNight,
};
use tracing::{error, warn};

/// One repair made by [`run_fixups`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repair {
    /// A component's recorded owner did not match the entity carrying it.
    ParentRederived {
        entity: EntityId,
        component: &'static str,
    },
    /// A holder referenced a missing entity or one that is not an item.
    ClearedHeldItem { holder: EntityId, item: EntityId },
    /// A furniture carrier referenced a missing entity.
    ClearedHeldFurniture { holder: EntityId, furniture: EntityId },
    /// A customer's chosen register is gone or has no line.
    ClearedQueueRegister { customer: EntityId, register: EntityId },
    /// A line held a customer that no longer exists.
    DroppedQueueEntry { register: EntityId, customer: EntityId },
    /// A second holder claimed an item that an earlier holder already had.
    ClearedDuplicateClaim {
        holder: EntityId,
        item: EntityId,
        kept_by: EntityId,
    },
}

/// Every repair made in one fixups pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixupReport {
    /// Repairs in the order they were made.
    pub repairs: Vec<Repair>,
}

impl FixupReport {
    /// Returns `true` if nothing needed repair.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.repairs.is_empty()
    }

    /// Number of repairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.repairs.len()
    }

    /// Returns `true` if nothing needed repair.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.is_clean()
    }
}

/// Repairs cross-entity references across the store's active collection.
///
/// Must run once after a whole batch has been inserted, never per entity,
/// since a reference may point at an entity later in the batch.
pub fn run_fixups(store: &mut EntityStore) -> FixupReport {
    let live: HashSet<EntityId> = store.ids().into_iter().collect();
    let items: HashSet<EntityId> = store
        .iter()
        .filter(|e| e.has::<IsItem>())
        .map(|e| e.id)
        .collect();
    let registers: HashSet<EntityId> = store
        .iter()
        .filter(|e| e.has::<HasWaitingQueue>())
        .map(|e| e.id)
        .collect();

    let mut report = FixupReport::default();
    let mut held: Vec<(EntityId, HeldBy, EntityId)> = Vec::new();

    for entity in store.iter_mut() {
        let id = entity.id;

        if let Some(pf) = entity.try_get_mut::<CanPathfind>() {
            if pf.parent != id {
                pf.parent = id;
                report.repairs.push(Repair::ParentRederived {
                    entity: id,
                    component: "CanPathfind",
                });
            }
        }
        if let Some(hooks) = entity.try_get_mut::<RespondsToDayNight>() {
            if hooks.parent != id {
                hooks.parent = id;
                report.repairs.push(Repair::ParentRederived {
                    entity: id,
                    component: "RespondsToDayNight",
                });
            }
        }

        if let Some(hands) = entity.try_get_mut::<CanHoldItem>() {
            if let Some(item) = hands.item_id() {
                if items.contains(&item) {
                    held.push((item, hands.hb_type(), id));
                } else {
                    error!(holder = %id, %item, "held item missing after restore");
                    hands.update(None);
                    report.repairs.push(Repair::ClearedHeldItem { holder: id, item });
                }
            }
        }

        if let Some(carrier) = entity.try_get_mut::<CanHoldFurniture>() {
            if let Some(furniture) = carrier.furniture_id() {
                if !live.contains(&furniture) {
                    error!(holder = %id, %furniture, "held furniture missing after restore");
                    carrier.update(None);
                    report.repairs.push(Repair::ClearedHeldFurniture {
                        holder: id,
                        furniture,
                    });
                }
            }
        }

        if let Some(waiting) = entity.try_get_mut::<AiWaitInQueue>() {
            if let Some(register) = waiting.register {
                if !registers.contains(&register) {
                    error!(customer = %id, %register, "queued register missing after restore");
                    waiting.register = None;
                    report.repairs.push(Repair::ClearedQueueRegister {
                        customer: id,
                        register,
                    });
                }
            }
        }

        if let Some(line) = entity.try_get_mut::<HasWaitingQueue>() {
            line.retain(|customer| {
                let keep = live.contains(&customer);
                if !keep {
                    error!(register = %id, %customer, "queued customer missing after restore");
                    report.repairs.push(Repair::DroppedQueueEntry {
                        register: id,
                        customer,
                    });
                }
                keep
            });
        }
    }

    for entity in store.iter_mut() {
        if let Some(is_item) = entity.try_get_mut::<IsItem>() {
            is_item.clear_held_by();
        }
    }

    let mut claimed: HashMap<EntityId, EntityId> = HashMap::new();
    for (item, held_by, holder) in held {
        if let Some(&kept_by) = claimed.get(&item) {
            warn!(%item, %holder, %kept_by, "item claimed by more than one holder");
            if let Some(hands) = store
                .get_by_id_mut(holder)
                .and_then(|e| e.try_get_mut::<CanHoldItem>())
            {
                hands.update(None);
            }
            report.repairs.push(Repair::ClearedDuplicateClaim {
                holder,
                item,
                kept_by,
            });
            continue;
        }
        claimed.insert(item, holder);
        if let Some(is_item) = store
            .get_by_id_mut(item)
            .and_then(|e| e.try_get_mut::<IsItem>())
        {
            is_item.set_held_by(held_by, holder);
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use barkeep_ecs::{Entity, RunMode};
    use barkeep_math::{FrontFaceDirection, Vec2};

    use super::*;

    #[test]
    fn test_dangling_item_reference_is_cleared() {
        let mut store = EntityStore::new(RunMode::Server);
        let holder = {
            let e = store.create();
            let mut hands = CanHoldItem::new(HeldBy::Customer);
            hands.update(Some(EntityId(123_456_789)));
            e.add(hands);
            e.id
        };

        let report = run_fixups(&mut store);
        assert!(store.get_enforced(holder).get::<CanHoldItem>().empty());
        assert_eq!(
            report.repairs,
            vec![Repair::ClearedHeldItem {
                holder,
                item: EntityId(123_456_789)
            }]
        );
    }

    #[test]
    fn test_reference_to_non_item_is_cleared() {
        let mut store = EntityStore::new(RunMode::Server);
        let wall = store.create().id;
        let holder = {
            let e = store.create();
            let mut hands = CanHoldItem::new(HeldBy::Furniture);
            hands.update(Some(wall));
            e.add(hands);
            e.id
        };
        let report = run_fixups(&mut store);
        assert!(store.get_enforced(holder).get::<CanHoldItem>().empty());
        assert_eq!(report.len(), 1);
    }

    #[test]
    fn test_parents_rederived_from_owner() {
        let mut store = EntityStore::new(RunMode::Server);
        let mut entity = Entity::with_id(EntityId(500));
        entity.add(CanPathfind::new(EntityId(1)));
        entity.add(RespondsToDayNight::new(EntityId(500)));
        store.insert(entity);

        let report = run_fixups(&mut store);
        let restored = store.get_enforced(EntityId(500));
        assert_eq!(restored.get::<CanPathfind>().parent, EntityId(500));
        assert_eq!(
            report.repairs,
            vec![Repair::ParentRederived {
                entity: EntityId(500),
                component: "CanPathfind"
            }]
        );
    }

    #[test]
    fn test_queue_links_validated() {
        let mut store = EntityStore::new(RunMode::Server);
        let customer = {
            let e = store.create();
            e.add(AiWaitInQueue {
                register: Some(EntityId(9_999_999)),
            });
            e.id
        };
        let register = {
            let e = store.create();
            barkeep_game::makers::make_register(e, Vec2::ZERO, FrontFaceDirection::Left);
            let line = e.get_mut::<HasWaitingQueue>();
            line.add_customer(EntityId(8_888_888));
            line.add_customer(customer);
            e.id
        };

        let report = run_fixups(&mut store);
        assert!(
            store
                .get_enforced(customer)
                .get::<AiWaitInQueue>()
                .register
                .is_none()
        );
        let line = store.get_enforced(register).get::<HasWaitingQueue>();
        assert!(line.matching_id(customer, 0));
        assert_eq!(report.len(), 2);
    }

    #[test]
    fn test_second_claim_on_an_item_is_cleared() {
        let mut store = EntityStore::new(RunMode::Server);
        let item = {
            let e = store.create();
            e.add(IsItem::default());
            e.id
        };
        let mut holders = Vec::new();
        for _ in 0..2 {
            let e = store.create();
            let mut hands = CanHoldItem::new(HeldBy::Furniture);
            hands.update(Some(item));
            e.add(hands);
            holders.push(e.id);
        }

        let report = run_fixups(&mut store);
        let (first, second) = (holders[0], holders[1]);
        assert_eq!(store.get_enforced(first).get::<CanHoldItem>().item_id(), Some(item));
        assert!(store.get_enforced(second).get::<CanHoldItem>().empty());
        assert_eq!(store.get_enforced(item).get::<IsItem>().holder(), Some(first));
        assert_eq!(
            report.repairs,
            vec![Repair::ClearedDuplicateClaim {
                holder: second,
                item,
                kept_by: first
            }]
        );
    }

    #[test]
    fn test_stale_holder_on_item_is_forgotten() {
        let mut store = EntityStore::new(RunMode::Server);
        let holder = {
            let e = store.create();
            e.add(CanHoldItem::new(HeldBy::Customer));
            e.id
        };
        let item = {
            let e = store.create();
            let mut is_item = IsItem::default();
            is_item.set_held_by(HeldBy::Customer, holder);
            e.add(is_item);
            e.id
        };

        let report = run_fixups(&mut store);
        assert!(report.is_clean());
        assert!(!store.get_enforced(item).get::<IsItem>().is_held());
    }

    #[test]
    fn test_clean_store_reports_nothing() {
        let mut store = EntityStore::new(RunMode::Server);
        let item = {
            let e = store.create();
            e.add(IsItem::default());
            e.id
        };
        let holder = {
            let e = store.create();
            let mut hands = CanHoldItem::new(HeldBy::Customer);
            hands.update(Some(item));
            e.add(hands);
            e.id
        };
        let report = run_fixups(&mut store);
        assert!(report.is_clean());
        assert_eq!(
            store.get_enforced(item).get::<IsItem>().holder(),
            Some(holder)
        );
    }
}
