//! Fluent entity queries.
//!
//! An [`EntityQuery`] borrows an [`EntityStore`], accumulates
//! [`Modification`]s (all of which must hold), at most one ordering and an
//! optional limit, and evaluates them in a single pass:
//!
//! ```text
//! candidates -> filter (AND of all modifications) -> sort -> take(limit)
//! ```
//!
//! Evaluation never caches. Each `gen*` call re-runs the pass against the
//! store's current contents, and because the query holds a shared borrow of
//! the store, the store cannot change while a query is alive.
//!
//! Every evaluation is O(candidates x modifications); there is no spatial
//! index.

use std::cmp::Ordering;
use std::fmt;

use crate::component::{Component, ComponentSet, get_type_id};
use crate::entity::{Entity, EntityId, EntityType, TagId};
use crate::store::EntityStore;

type Predicate<'a> = Box<dyn Fn(&Entity) -> bool + 'a>;
type Orderer<'a> = Box<dyn Fn(&Entity, &Entity) -> Ordering + 'a>;

/// A composable entity predicate.
pub struct Modification<'a> {
    label: &'static str,
    predicate: Predicate<'a>,
}

impl<'a> Modification<'a> {
    /// Wraps `predicate` under a descriptive label (used in logs).
    pub fn new(label: &'static str, predicate: impl Fn(&Entity) -> bool + 'a) -> Self {
        Self {
            label,
            predicate: Box::new(predicate),
        }
    }

    /// Evaluates the predicate.
    #[must_use]
    pub fn matches(&self, entity: &Entity) -> bool {
        (self.predicate)(entity)
    }

    /// The modification's label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Inverts this modification.
    #[must_use]
    pub fn negate(self) -> Self {
        let inner = self.predicate;
        Self {
            label: "not",
            predicate: Box::new(move |entity| !inner(entity)),
        }
    }
}

impl fmt::Debug for Modification<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Modification").field(&self.label).finish()
    }
}

/// A filter/sort/limit builder over an [`EntityStore`].
pub struct EntityQuery<'a> {
    store: &'a EntityStore,
    pinned: Option<Vec<EntityId>>,
    modifications: Vec<Modification<'a>>,
    order: Option<(&'static str, Orderer<'a>)>,
    limit: Option<usize>,
    hidden: ComponentSet,
}

impl<'a> EntityQuery<'a> {
    /// Starts a query over the store's active collection.
    #[must_use]
    pub fn new(store: &'a EntityStore) -> Self {
        Self {
            store,
            pinned: None,
            modifications: Vec::new(),
            order: None,
            limit: None,
            hidden: ComponentSet::EMPTY,
        }
    }

    /// Starts a query restricted to an explicit list of entity IDs, e.g. the
    /// list captured at the top of the tick. IDs no longer live are skipped.
    #[must_use]
    pub fn pinned(store: &'a EntityStore, ids: Vec<EntityId>) -> Self {
        Self {
            pinned: Some(ids),
            ..Self::new(store)
        }
    }

    /// The store this query reads from.
    #[must_use]
    pub fn store(&self) -> &'a EntityStore {
        self.store
    }

    /// Appends a modification.
    #[must_use]
    pub fn add_mod(mut self, modification: Modification<'a>) -> Self {
        self.modifications.push(modification);
        self
    }

    /// Appends the negation of a modification.
    #[must_use]
    pub fn where_not(self, modification: Modification<'a>) -> Self {
        self.add_mod(modification.negate())
    }

    /// Keeps only the entity with this ID.
    #[must_use]
    pub fn where_id(self, id: EntityId) -> Self {
        self.add_mod(Modification::new("where_id", move |e| e.id == id))
    }

    /// Drops the entity with this ID.
    #[must_use]
    pub fn where_not_id(self, id: EntityId) -> Self {
        self.add_mod(Modification::new("where_not_id", move |e| e.id != id))
    }

    /// Keeps entities of this type.
    #[must_use]
    pub fn where_type(self, entity_type: EntityType) -> Self {
        self.add_mod(Modification::new("where_type", move |e| e.entity_type == entity_type))
    }

    /// Drops entities of this type.
    #[must_use]
    pub fn where_not_type(self, entity_type: EntityType) -> Self {
        self.add_mod(Modification::new("where_not_type", move |e| {
            e.entity_type != entity_type
        }))
    }

    /// Keeps entities carrying this tag.
    #[must_use]
    pub fn where_tag(self, tag: TagId) -> Self {
        self.add_mod(Modification::new("where_tag", move |e| e.has_tag(tag)))
    }

    /// Keeps entities that have a `T`.
    #[must_use]
    pub fn where_has<T: Component>(self) -> Self {
        let id = get_type_id::<T>();
        self.add_mod(Modification::new("where_has", move |e| e.has_type_id(id)))
    }

    /// Keeps entities that have no `T`.
    #[must_use]
    pub fn where_missing<T: Component>(self) -> Self {
        let id = get_type_id::<T>();
        self.add_mod(Modification::new("where_missing", move |e| !e.has_type_id(id)))
    }

    /// Keeps entities that have a `T` for which `f` holds.
    #[must_use]
    pub fn where_has_and<T: Component>(self, f: impl Fn(&T) -> bool + 'a) -> Self {
        self.add_mod(Modification::new("where_has_and", move |e| {
            e.try_get::<T>().is_some_and(&f)
        }))
    }

    /// Keeps entities for which `f` holds if they have a `T`; entities
    /// without one are kept.
    #[must_use]
    pub fn where_if_has<T: Component>(self, f: impl Fn(&T) -> bool + 'a) -> Self {
        self.add_mod(Modification::new("where_if_has", move |e| {
            e.try_get::<T>().is_none_or(&f)
        }))
    }

    /// Keeps entities for which `f` holds.
    #[must_use]
    pub fn where_lambda(self, f: impl Fn(&Entity) -> bool + 'a) -> Self {
        self.add_mod(Modification::new("where_lambda", f))
    }

    /// Keeps entities for which `f` returns `Some(true)`; `None` means the
    /// entity lacks what `f` looks at and is dropped.
    #[must_use]
    pub fn where_lambda_exists_and_true(self, f: impl Fn(&Entity) -> Option<bool> + 'a) -> Self {
        self.add_mod(Modification::new("where_lambda_exists_and_true", move |e| {
            f(e).unwrap_or(false)
        }))
    }

    /// Caps the number of results.
    #[must_use]
    pub fn take(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Orders results. Only the first ordering set on a query is used.
    #[must_use]
    pub fn order_by(
        mut self,
        label: &'static str,
        f: impl Fn(&Entity, &Entity) -> Ordering + 'a,
    ) -> Self {
        if let Some((existing, _)) = &self.order {
            tracing::warn!(existing = *existing, ignored = label, "query already ordered");
            return self;
        }
        self.order = Some((label, Box::new(f)));
        self
    }

    /// Excludes entities carrying a `T` unless revealed again.
    #[must_use]
    pub fn hide<T: Component>(mut self) -> Self {
        self.hidden.insert(get_type_id::<T>());
        self
    }

    /// Stops excluding entities carrying a `T`.
    #[must_use]
    pub fn reveal<T: Component>(mut self) -> Self {
        self.hidden.remove(get_type_id::<T>());
        self
    }

    fn candidates(&self) -> Box<dyn Iterator<Item = &'a Entity> + '_> {
        let store = self.store;
        match &self.pinned {
            Some(ids) => Box::new(ids.iter().filter_map(move |&id| store.get_by_id(id))),
            None => Box::new(store.iter()),
        }
    }

    fn accepts(&self, entity: &Entity) -> bool {
        !entity.component_set().intersects(self.hidden)
            && self.modifications.iter().all(|m| m.matches(entity))
    }

    fn run(&self) -> Vec<&'a Entity> {
        let mut matches: Vec<&'a Entity> = self.candidates().filter(|e| self.accepts(e)).collect();
        if let Some((_, order)) = &self.order {
            matches.sort_by(|a, b| order(a, b));
        }
        if let Some(limit) = self.limit {
            matches.truncate(limit);
        }
        matches
    }

    /// Every match.
    #[must_use]
    pub fn gen_all(&self) -> Vec<&'a Entity> {
        self.run()
    }

    /// The first match, if any.
    #[must_use]
    pub fn gen_first(&self) -> Option<&'a Entity> {
        if self.order.is_some() {
            return self.run().into_iter().next();
        }
        if self.limit == Some(0) {
            return None;
        }
        self.candidates().find(|e| self.accepts(e))
    }

    /// The first match, treating "no match" as a bug.
    ///
    /// # Panics
    ///
    /// Panics if nothing matches.
    #[must_use]
    pub fn gen_first_enforce(&self) -> &'a Entity {
        match self.gen_first() {
            Some(entity) => entity,
            None => {
                tracing::error!(modifications = ?self.modifications, "enforced query had no match");
                panic!("query had no match")
            }
        }
    }

    /// IDs of every match.
    #[must_use]
    pub fn gen_ids(&self) -> Vec<EntityId> {
        self.run().into_iter().map(|e| e.id).collect()
    }

    /// ID of the first match, if any.
    #[must_use]
    pub fn gen_first_id(&self) -> Option<EntityId> {
        self.gen_first().map(|e| e.id)
    }

    /// Number of matches.
    #[must_use]
    pub fn gen_count(&self) -> usize {
        match (&self.order, self.limit) {
            (None, None) => self.candidates().filter(|e| self.accepts(e)).count(),
            _ => self.run().len(),
        }
    }

    /// Returns `true` if anything matches.
    #[must_use]
    pub fn has_values(&self) -> bool {
        self.gen_first().is_some()
    }
}

impl fmt::Debug for EntityQuery<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityQuery")
            .field("pinned", &self.pinned.as_ref().map(Vec::len))
            .field("modifications", &self.modifications)
            .field("order", &self.order.as_ref().map(|(label, _)| *label))
            .field("limit", &self.limit)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::store::RunMode;

    #[derive(Debug)]
    struct Score(i32);

    impl Component for Score {
        fn type_name() -> &'static str {
            "Score"
        }
    }

    #[derive(Debug)]
    struct Hidden;

    impl Component for Hidden {
        fn type_name() -> &'static str {
            "Hidden"
        }
    }

    fn populated() -> EntityStore {
        let mut store = EntityStore::new(RunMode::Server);
        for i in 0..10 {
            let e = store.create();
            e.entity_type = if i % 2 == 0 {
                EntityType::Customer
            } else {
                EntityType::Table
            };
            if i % 3 == 0 {
                e.add(Score(i));
            }
            if i == 9 {
                e.add(Hidden);
            }
        }
        store
    }

    fn id_set(ids: Vec<EntityId>) -> HashSet<EntityId> {
        ids.into_iter().collect()
    }

    #[test]
    fn test_and_is_intersection() {
        let store = populated();
        let p = id_set(EntityQuery::new(&store).where_type(EntityType::Customer).gen_ids());
        let q = id_set(EntityQuery::new(&store).where_has::<Score>().gen_ids());
        let both = id_set(
            EntityQuery::new(&store)
                .where_type(EntityType::Customer)
                .where_has::<Score>()
                .gen_ids(),
        );
        assert_eq!(both, &p & &q);
        assert_eq!(both.len(), 2);
    }

    #[test]
    fn test_negation_is_complement() {
        let store = populated();
        let all = id_set(store.ids());
        let matched = id_set(EntityQuery::new(&store).where_has::<Score>().gen_ids());
        let negated = id_set(
            EntityQuery::new(&store)
                .where_not(Modification::new("has_score", |e| e.has::<Score>()))
                .gen_ids(),
        );
        assert_eq!(negated, &all - &matched);
    }

    #[test]
    fn test_take_limits_results() {
        let store = populated();
        let unrestricted = EntityQuery::new(&store).where_type(EntityType::Table).gen_count();
        assert_eq!(unrestricted, 5);
        for k in [0, 1, 3, 5, 8] {
            let q = EntityQuery::new(&store).where_type(EntityType::Table).take(k);
            assert_eq!(q.gen_all().len(), k.min(unrestricted));
            // Re-evaluating the same query gives the same answer.
            assert_eq!(q.gen_count(), k.min(unrestricted));
        }
    }

    #[test]
    fn test_first_order_wins() {
        let store = populated();
        let best = EntityQuery::new(&store)
            .where_has::<Score>()
            .order_by("score_desc", |a, b| {
                b.get::<Score>().0.cmp(&a.get::<Score>().0)
            })
            .order_by("score_asc", |a, b| {
                a.get::<Score>().0.cmp(&b.get::<Score>().0)
            })
            .gen_first_enforce();
        assert_eq!(best.get::<Score>().0, 9);
    }

    #[test]
    fn test_hidden_components_excluded_until_revealed() {
        let store = populated();
        assert_eq!(EntityQuery::new(&store).hide::<Hidden>().gen_count(), 9);
        assert_eq!(
            EntityQuery::new(&store)
                .hide::<Hidden>()
                .reveal::<Hidden>()
                .gen_count(),
            10
        );
    }

    #[test]
    fn test_component_lambdas() {
        let store = populated();
        let high = EntityQuery::new(&store).where_has_and::<Score>(|s| s.0 >= 6).gen_count();
        assert_eq!(high, 2);
        let if_has = EntityQuery::new(&store).where_if_has::<Score>(|s| s.0 >= 6).gen_count();
        assert_eq!(if_has, 8);
        let exists = EntityQuery::new(&store)
            .where_lambda_exists_and_true(|e| e.try_get::<Score>().map(|s| s.0 == 3))
            .gen_count();
        assert_eq!(exists, 1);
    }

    #[test]
    fn test_pinned_candidates_ignore_later_spawns() {
        let mut store = populated();
        let before = store.ids();
        store.create();
        let pinned = EntityQuery::pinned(&store, before).gen_count();
        assert_eq!(pinned, 10);
        assert_eq!(EntityQuery::new(&store).gen_count(), 11);
    }

    #[test]
    fn test_empty_results() {
        let store = EntityStore::new(RunMode::Server);
        let q = EntityQuery::new(&store).where_has::<Score>();
        assert!(!q.has_values());
        assert!(q.gen_first().is_none());
        assert!(q.gen_all().is_empty());
    }
}
