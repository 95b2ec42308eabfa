//! Entity storage.
//!
//! The [`EntityStore`] owns every live entity. It holds two parallel
//! collections, server-authoritative and client-predicted, and works on
//! whichever one the [`RunMode`] chosen at construction selects.
//!
//! Deletion is deferred: [`EntityStore::mark_for_cleanup`] only sets a flag
//! and [`EntityStore::sweep_cleanup`] removes flagged entities once per tick,
//! after all systems ran, so no scan ever sees its collection shrink.

use std::collections::HashSet;
use std::fmt;

use dashmap::DashMap;

use crate::entity::{Entity, EntityId, NamedEntity};

/// Which entity collection a process works on. Fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RunMode {
    /// Authoritative simulation.
    #[default]
    Server,
    /// Client-side prediction and rendering.
    Client,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Server => f.write_str("server"),
            RunMode::Client => f.write_str("client"),
        }
    }
}

/// Per-iteration signal returned by [`EntityStore::for_each`] callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForEachFlow {
    /// Keep going.
    NormalFlow,
    /// Skip the rest of this entity and move on to the next.
    Continue,
    /// Abort the whole scan.
    Break,
}

/// Grid cell key for the walkability memo.
pub type GridCell = (i32, i32);

/// Owner of all live entities.
pub struct EntityStore {
    mode: RunMode,
    server: Vec<Entity>,
    client: Vec<Entity>,
    permanent: HashSet<EntityId>,
    named: DashMap<NamedEntity, EntityId>,
    walkable: DashMap<GridCell, bool>,
}

impl EntityStore {
    /// Creates an empty store working on the collection selected by `mode`.
    #[must_use]
    pub fn new(mode: RunMode) -> Self {
        tracing::debug!(%mode, "entity store created");
        Self {
            mode,
            server: Vec::new(),
            client: Vec::new(),
            permanent: HashSet::new(),
            named: DashMap::new(),
            walkable: DashMap::new(),
        }
    }

    /// The run mode this store was created with.
    #[must_use]
    pub fn mode(&self) -> RunMode {
        self.mode
    }

    fn active(&self) -> &Vec<Entity> {
        match self.mode {
            RunMode::Server => &self.server,
            RunMode::Client => &self.client,
        }
    }

    fn active_mut(&mut self) -> &mut Vec<Entity> {
        match self.mode {
            RunMode::Server => &mut self.server,
            RunMode::Client => &mut self.client,
        }
    }

    /// Explicit access to either collection, regardless of the run mode.
    #[must_use]
    pub fn collection(&self, mode: RunMode) -> &[Entity] {
        match mode {
            RunMode::Server => &self.server,
            RunMode::Client => &self.client,
        }
    }

    /// Creates a new empty entity in the active collection.
    ///
    /// Invalidates the walkability memo since the new entity may occupy a
    /// cell once it gets a transform.
    pub fn create(&mut self) -> &mut Entity {
        self.insert(Entity::new())
    }

    /// Like [`EntityStore::create`], but exempt from
    /// `delete_all(include_permanent = false)`.
    pub fn create_permanent(&mut self) -> &mut Entity {
        let entity = Entity::new();
        self.permanent.insert(entity.id);
        self.insert(entity)
    }

    /// Inserts an already constructed entity, e.g. one decoded from a
    /// snapshot.
    pub fn insert(&mut self, entity: Entity) -> &mut Entity {
        debug_assert!(
            self.get_by_id(entity.id).is_none(),
            "{} inserted twice",
            entity.id
        );
        self.walkable.clear();
        let entities = self.active_mut();
        let index = entities.len();
        entities.push(entity);
        &mut entities[index]
    }

    /// Marks an entity to be removed at the next sweep. No-op when the ID is
    /// not live.
    pub fn mark_for_cleanup(&mut self, id: EntityId) {
        match self.get_by_id_mut(id) {
            Some(entity) => entity.cleanup = true,
            None => tracing::debug!(entity = %id, "cleanup requested for missing entity"),
        }
    }

    /// Removes every entity whose `cleanup` flag is set and returns their
    /// IDs.
    pub fn sweep_cleanup(&mut self) -> Vec<EntityId> {
        let mut removed = Vec::new();
        self.active_mut().retain(|entity| {
            if entity.cleanup {
                removed.push(entity.id);
            }
            !entity.cleanup
        });
        if !removed.is_empty() {
            tracing::debug!(count = removed.len(), "swept entities");
            self.forget(&removed);
        }
        removed
    }

    /// Clears the active collection, or only its non-permanent entities.
    pub fn delete_all(&mut self, include_permanent: bool) {
        let removed: Vec<EntityId> = if include_permanent {
            self.active().iter().map(|e| e.id).collect()
        } else {
            self.active()
                .iter()
                .map(|e| e.id)
                .filter(|id| !self.permanent.contains(id))
                .collect()
        };
        if include_permanent {
            self.active_mut().clear();
        } else {
            let permanent = &self.permanent;
            match self.mode {
                RunMode::Server => self.server.retain(|e| permanent.contains(&e.id)),
                RunMode::Client => self.client.retain(|e| permanent.contains(&e.id)),
            }
        }
        tracing::info!(count = removed.len(), include_permanent, "deleted entities");
        self.forget(&removed);
    }

    /// Removes one entity immediately and hands it back.
    ///
    /// Only for code running outside a tick, e.g. applying a network
    /// delta; systems use [`EntityStore::mark_for_cleanup`].
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let position = self.active().iter().position(|e| e.id == id)?;
        let entity = self.active_mut().remove(position);
        self.forget(&[id]);
        Some(entity)
    }

    /// Drops caches and permanence records that refer to removed IDs.
    fn forget(&mut self, removed: &[EntityId]) {
        for id in removed {
            self.permanent.remove(id);
        }
        self.named.retain(|_, id| !removed.contains(id));
        self.walkable.clear();
    }

    /// Clears both collections and every cache.
    pub fn reset(&mut self) {
        self.server.clear();
        self.client.clear();
        self.permanent.clear();
        self.named.clear();
        self.walkable.clear();
    }

    /// Looks an entity up by ID. Linear in the number of live entities.
    #[must_use]
    pub fn get_by_id(&self, id: EntityId) -> Option<&Entity> {
        self.active().iter().find(|e| e.id == id)
    }

    /// Mutable variant of [`EntityStore::get_by_id`].
    #[must_use]
    pub fn get_by_id_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.active_mut().iter_mut().find(|e| e.id == id)
    }

    /// Looks an entity up by ID, treating absence as a bug.
    ///
    /// # Panics
    ///
    /// Panics if the entity does not exist.
    #[must_use]
    pub fn get_enforced(&self, id: EntityId) -> &Entity {
        match self.get_by_id(id) {
            Some(entity) => entity,
            None => missing_entity(id),
        }
    }

    /// Mutable variant of [`EntityStore::get_enforced`].
    ///
    /// # Panics
    ///
    /// Panics if the entity does not exist.
    pub fn get_enforced_mut(&mut self, id: EntityId) -> &mut Entity {
        match self.get_by_id_mut(id) {
            Some(entity) => entity,
            None => missing_entity(id),
        }
    }

    /// Visits every live entity until the callback returns
    /// [`ForEachFlow::Break`]. Returns `true` if the scan was aborted.
    pub fn for_each(&self, mut f: impl FnMut(&Entity) -> ForEachFlow) -> bool {
        for entity in self.active() {
            if f(entity) == ForEachFlow::Break {
                return true;
            }
        }
        false
    }

    /// Mutable variant of [`EntityStore::for_each`].
    pub fn for_each_mut(&mut self, mut f: impl FnMut(&mut Entity) -> ForEachFlow) -> bool {
        for entity in self.active_mut() {
            if f(entity) == ForEachFlow::Break {
                return true;
            }
        }
        false
    }

    /// Iterates over the active collection.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.active().iter()
    }

    /// Iterates mutably over the active collection.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.active_mut().iter_mut()
    }

    /// IDs of every live entity, in storage order.
    ///
    /// Taken at the top of a tick this is the list that queries can be
    /// pinned to when they must not observe same-tick spawns.
    #[must_use]
    pub fn ids(&self) -> Vec<EntityId> {
        self.active().iter().map(|e| e.id).collect()
    }

    /// Number of live entities in the active collection.
    #[must_use]
    pub fn len(&self) -> usize {
        self.active().len()
    }

    /// Returns `true` if the active collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active().is_empty()
    }

    /// Returns `true` if `id` was created with
    /// [`EntityStore::create_permanent`].
    #[must_use]
    pub fn is_permanent(&self, id: EntityId) -> bool {
        self.permanent.contains(&id)
    }

    /// Marks an existing entity as permanent (used when restoring one).
    pub fn make_permanent(&mut self, id: EntityId) {
        self.permanent.insert(id);
    }

    /// Resolves a well-known singleton entity.
    ///
    /// The resolved ID is cached; the cache is validated on every lookup and
    /// dropped whenever the entity is swept or deleted.
    #[must_use]
    pub fn get_possible_named_entity(&self, name: NamedEntity) -> Option<&Entity> {
        let cached = self.named.get(&name).map(|id| *id);
        if let Some(id) = cached {
            match self.get_by_id(id) {
                Some(entity) if entity.entity_type == name.entity_type() => return Some(entity),
                _ => {
                    self.named.remove(&name);
                }
            }
        }
        let entity = self
            .active()
            .iter()
            .find(|e| e.entity_type == name.entity_type())?;
        self.named.insert(name, entity.id);
        Some(entity)
    }

    /// Mutable variant of [`EntityStore::get_possible_named_entity`].
    #[must_use]
    pub fn get_possible_named_entity_mut(&mut self, name: NamedEntity) -> Option<&mut Entity> {
        let id = self.get_possible_named_entity(name)?.id;
        self.get_by_id_mut(id)
    }

    /// Resolves a well-known singleton entity, treating absence as a bug.
    ///
    /// # Panics
    ///
    /// Panics if no entity of the singleton's type exists.
    #[must_use]
    pub fn get_named_entity(&self, name: NamedEntity) -> &Entity {
        match self.get_possible_named_entity(name) {
            Some(entity) => entity,
            None => {
                tracing::error!(?name, "named entity not found");
                panic!("named entity {name:?} does not exist")
            }
        }
    }

    /// Memoised walkability lookup for a grid cell.
    ///
    /// `compute` runs only on a miss; the memo is cleared whenever an entity
    /// is created, inserted or removed.
    pub fn cached_walkable(&self, cell: GridCell, compute: impl FnOnce(&Self) -> bool) -> bool {
        if let Some(hit) = self.walkable.get(&cell) {
            return *hit;
        }
        let walkable = compute(self);
        self.walkable.insert(cell, walkable);
        walkable
    }

    /// Drops every memoised walkability result.
    pub fn invalidate_walkable(&self) {
        self.walkable.clear();
    }
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new(RunMode::default())
    }
}

impl fmt::Debug for EntityStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityStore")
            .field("mode", &self.mode)
            .field("server", &self.server.len())
            .field("client", &self.client.len())
            .field("permanent", &self.permanent.len())
            .finish_non_exhaustive()
    }
}

#[cold]
fn missing_entity(id: EntityId) -> ! {
    tracing::error!(entity = %id, "enforced lookup failed");
    panic!("{id} does not exist")
}
