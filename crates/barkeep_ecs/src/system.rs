//! System scheduler.
//!
//! Systems are registered into two ordered lists, update and render, and run
//! in exactly that order every tick. Nothing is reordered or parallelised:
//! a system observes every mutation made by the systems registered before
//! it in the same tick.
//!
//! Two flavours of update system exist:
//!
//! - [`OnceSystem`]: one callback per tick with the whole world.
//! - [`EntitySystem`]: one callback per entity that carries every component
//!   of the system's [`ComponentTuple`] (and its required tags). Entities
//!   missing a component are skipped structurally.
//!
//! Both are gated by `should_run`, evaluated once per tick before any
//! dispatch.

use crate::component::{Component, ComponentSet, get_type_id};
use crate::entity::{ComponentStorage, Entity, EntityId, EntityMeta, TagSet};
use crate::store::EntityStore;

/// Access to the entity store plus whatever read-only resources a world
/// hands to per-entity systems.
pub trait WorldAccess {
    /// Shared state per-entity systems may read while entities are borrowed.
    type Resources;

    /// The entity store.
    fn entities(&self) -> &EntityStore;

    /// The entity store, mutably.
    fn entities_mut(&mut self) -> &mut EntityStore;

    /// Borrows the store mutably and the resources immutably at once.
    fn split_mut(&mut self) -> (&mut EntityStore, &Self::Resources);
}

/// A statically typed set of components fetched together from one entity.
///
/// Implemented for tuples of one to four component types.
pub trait ComponentTuple: 'static {
    /// Mutable references to each component.
    type Refs<'e>;

    /// Presence set an entity needs to be visited.
    fn type_set() -> ComponentSet;

    /// Borrows each component mutably. `None` if any is absent.
    fn fetch(storage: &mut ComponentStorage) -> Option<Self::Refs<'_>>;
}

macro_rules! impl_component_tuple {
    ($(($ty:ident, $slot:ident)),+) => {
        impl<$($ty: Component),+> ComponentTuple for ($($ty,)+) {
            type Refs<'e> = ($(&'e mut $ty,)+);

            fn type_set() -> ComponentSet {
                ComponentSet::from_ids(&[$(get_type_id::<$ty>()),+])
            }

            fn fetch(storage: &mut ComponentStorage) -> Option<Self::Refs<'_>> {
                let [$($slot),+] = storage.slots_disjoint_mut([$(get_type_id::<$ty>()),+])?;
                Some(($($slot?.as_any_mut().downcast_mut::<$ty>()?,)+))
            }
        }
    };
}

impl_component_tuple!((A, a));
impl_component_tuple!((A, a), (B, b));
impl_component_tuple!((A, a), (B, b), (C, c));
impl_component_tuple!((A, a), (B, b), (C, c), (D, d));

/// Deferred structural changes requested by per-entity systems.
///
/// Applied to the store right after the requesting system finishes, so
/// systems registered later in the same tick see them.
#[derive(Debug, Default)]
pub struct Commands {
    spawns: Vec<Entity>,
    cleanups: Vec<EntityId>,
}

impl Commands {
    /// Creates an empty command buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a new entity and returns it for construction. The ID is
    /// allocated immediately.
    pub fn spawn(&mut self) -> &mut Entity {
        let index = self.spawns.len();
        self.spawns.push(Entity::new());
        &mut self.spawns[index]
    }

    /// Queues a cleanup mark for another entity.
    pub fn mark_for_cleanup(&mut self, id: EntityId) {
        self.cleanups.push(id);
    }

    /// Returns `true` if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spawns.is_empty() && self.cleanups.is_empty()
    }

    /// Applies every queued change to `store`.
    pub fn apply(self, store: &mut EntityStore) {
        for entity in self.spawns {
            store.insert(entity);
        }
        for id in self.cleanups {
            store.mark_for_cleanup(id);
        }
    }
}

/// A system that runs once per tick.
pub trait OnceSystem<W> {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Gate evaluated once per tick.
    fn should_run(&self, _world: &W, _dt: f32) -> bool {
        true
    }

    /// The per-tick callback.
    fn once(&mut self, world: &mut W, dt: f32);
}

/// A system that runs once per matching entity. Entities already marked
/// for cleanup are not visited.
pub trait EntitySystem<W: WorldAccess> {
    /// Components an entity must carry to be visited.
    type Components: ComponentTuple;

    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Tags an entity must carry to be visited.
    fn required_tags(&self) -> TagSet {
        TagSet::EMPTY
    }

    /// Gate evaluated once per tick, before any entity is visited.
    fn should_run(&self, _world: &W, _dt: f32) -> bool {
        true
    }

    /// The per-entity callback.
    fn for_each_with<'e>(
        &mut self,
        entity: EntityMeta<'e>,
        components: <Self::Components as ComponentTuple>::Refs<'e>,
        resources: &W::Resources,
        commands: &mut Commands,
        dt: f32,
    );
}

/// A system that reads the world and writes into a frame output.
///
/// The world is borrowed immutably, so render systems cannot mutate
/// gameplay state.
pub trait RenderSystem<W, F> {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Gate evaluated once per frame.
    fn should_run(&self, _world: &W, _dt: f32) -> bool {
        true
    }

    /// The per-frame callback.
    fn render(&mut self, world: &W, frame: &mut F, dt: f32);
}

trait Runnable<W> {
    fn name(&self) -> &'static str;
    fn should_run(&self, world: &W, dt: f32) -> bool;
    fn run(&mut self, world: &mut W, dt: f32);
}

struct OnceRunner<S>(S);

impl<W, S: OnceSystem<W>> Runnable<W> for OnceRunner<S> {
    fn name(&self) -> &'static str {
        self.0.name()
    }

    fn should_run(&self, world: &W, dt: f32) -> bool {
        self.0.should_run(world, dt)
    }

    fn run(&mut self, world: &mut W, dt: f32) {
        self.0.once(world, dt);
    }
}

struct EntityRunner<S>(S);

impl<W: WorldAccess, S: EntitySystem<W>> Runnable<W> for EntityRunner<S> {
    fn name(&self) -> &'static str {
        self.0.name()
    }

    fn should_run(&self, world: &W, dt: f32) -> bool {
        self.0.should_run(world, dt)
    }

    fn run(&mut self, world: &mut W, dt: f32) {
        let required = <S::Components as ComponentTuple>::type_set();
        let tags = self.0.required_tags();
        let mut commands = Commands::new();
        let (store, resources) = world.split_mut();
        for entity in store.iter_mut() {
            if entity.cleanup
                || !entity.component_set().contains_all(required)
                || !entity.tags.contains_all(tags)
            {
                continue;
            }
            let (meta, storage) = entity.split_mut();
            let Some(components) = <S::Components as ComponentTuple>::fetch(storage) else {
                continue;
            };
            self.0.for_each_with(meta, components, resources, &mut commands, dt);
        }
        if !commands.is_empty() {
            commands.apply(store);
        }
    }
}

/// Ordered update and render system lists.
pub struct SystemManager<W, F> {
    update: Vec<Box<dyn Runnable<W>>>,
    render: Vec<Box<dyn RenderSystem<W, F>>>,
}

impl<W: WorldAccess + 'static, F: 'static> SystemManager<W, F> {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self {
            update: Vec::new(),
            render: Vec::new(),
        }
    }

    /// Appends a once-per-tick update system.
    pub fn register_once(&mut self, system: impl OnceSystem<W> + 'static) -> &mut Self {
        tracing::debug!(system = system.name(), "registered update system");
        self.update.push(Box::new(OnceRunner(system)));
        self
    }

    /// Appends a per-entity update system.
    pub fn register_for_each(&mut self, system: impl EntitySystem<W> + 'static) -> &mut Self {
        tracing::debug!(system = system.name(), "registered update system");
        self.update.push(Box::new(EntityRunner(system)));
        self
    }

    /// Appends a render system.
    pub fn register_render(&mut self, system: impl RenderSystem<W, F> + 'static) -> &mut Self {
        tracing::debug!(system = system.name(), "registered render system");
        self.render.push(Box::new(system));
        self
    }

    /// Names of the update systems in registration order.
    #[must_use]
    pub fn update_names(&self) -> Vec<&'static str> {
        self.update.iter().map(|s| s.name()).collect()
    }

    /// Names of the render systems in registration order.
    #[must_use]
    pub fn render_names(&self) -> Vec<&'static str> {
        self.render.iter().map(|s| s.name()).collect()
    }

    /// Runs every update system in registration order.
    pub fn update(&mut self, world: &mut W, dt: f32) {
        for system in &mut self.update {
            if !system.should_run(world, dt) {
                continue;
            }
            tracing::trace!(system = system.name(), "update");
            system.run(world, dt);
        }
    }

    /// Runs every render system in registration order.
    pub fn render(&mut self, world: &W, frame: &mut F, dt: f32) {
        for system in &mut self.render {
            if !system.should_run(world, dt) {
                continue;
            }
            tracing::trace!(system = system.name(), "render");
            system.render(world, frame, dt);
        }
    }

    /// One full tick: update systems, then render systems, then the cleanup
    /// sweep. Returns the IDs swept.
    pub fn tick(&mut self, world: &mut W, frame: &mut F, dt: f32) -> Vec<EntityId> {
        self.update(world, dt);
        self.render(world, frame, dt);
        world.entities_mut().sweep_cleanup()
    }
}

impl<W: WorldAccess + 'static, F: 'static> Default for SystemManager<W, F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W, F> std::fmt::Debug for SystemManager<W, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let update: Vec<&str> = self.update.iter().map(|s| s.name()).collect();
        let render: Vec<&str> = self.render.iter().map(|s| s.name()).collect();
        f.debug_struct("SystemManager")
            .field("update", &update)
            .field("render", &render)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RunMode;

    #[derive(Debug)]
    struct Counter(u32);

    impl Component for Counter {
        fn type_name() -> &'static str {
            "Counter"
        }
    }

    #[derive(Debug)]
    struct Step(u32);

    impl Component for Step {
        fn type_name() -> &'static str {
            "Step"
        }
    }

    struct TestWorld {
        store: EntityStore,
        enabled: bool,
        log: Vec<&'static str>,
    }

    impl WorldAccess for TestWorld {
        type Resources = bool;

        fn entities(&self) -> &EntityStore {
            &self.store
        }

        fn entities_mut(&mut self) -> &mut EntityStore {
            &mut self.store
        }

        fn split_mut(&mut self) -> (&mut EntityStore, &bool) {
            (&mut self.store, &self.enabled)
        }
    }

    fn world() -> TestWorld {
        TestWorld {
            store: EntityStore::new(RunMode::Server),
            enabled: true,
            log: Vec::new(),
        }
    }

    struct AddStep;

    impl EntitySystem<TestWorld> for AddStep {
        type Components = (Counter, Step);

        fn name(&self) -> &'static str {
            "add_step"
        }

        fn for_each_with<'e>(
            &mut self,
            _entity: EntityMeta<'e>,
            (counter, step): (&'e mut Counter, &'e mut Step),
            enabled: &bool,
            _commands: &mut Commands,
            _dt: f32,
        ) {
            if *enabled {
                counter.0 += step.0;
            }
        }
    }

    struct Record(&'static str);

    impl OnceSystem<TestWorld> for Record {
        fn name(&self) -> &'static str {
            self.0
        }

        fn once(&mut self, world: &mut TestWorld, _dt: f32) {
            world.log.push(self.0);
        }
    }

    struct Gated;

    impl OnceSystem<TestWorld> for Gated {
        fn name(&self) -> &'static str {
            "gated"
        }

        fn should_run(&self, world: &TestWorld, _dt: f32) -> bool {
            world.enabled
        }

        fn once(&mut self, world: &mut TestWorld, _dt: f32) {
            world.log.push("gated");
        }
    }

    struct Spawner;

    impl EntitySystem<TestWorld> for Spawner {
        type Components = (Counter,);

        fn name(&self) -> &'static str {
            "spawner"
        }

        fn for_each_with<'e>(
            &mut self,
            entity: EntityMeta<'e>,
            (counter,): (&'e mut Counter,),
            _enabled: &bool,
            commands: &mut Commands,
            _dt: f32,
        ) {
            counter.0 += 1;
            commands.spawn().add(Counter(0));
            *entity.cleanup = true;
        }
    }

    #[test]
    fn test_entity_system_skips_entities_missing_components() {
        let mut w = world();
        let full = {
            let e = w.store.create();
            e.add(Counter(1));
            e.add(Step(2));
            e.id
        };
        let partial = {
            let e = w.store.create();
            e.add(Counter(1));
            e.id
        };
        let mut manager: SystemManager<TestWorld, ()> = SystemManager::new();
        manager.register_for_each(AddStep);
        manager.update(&mut w, 0.1);
        assert_eq!(w.store.get_enforced(full).get::<Counter>().0, 3);
        assert_eq!(w.store.get_enforced(partial).get::<Counter>().0, 1);
    }

    #[test]
    fn test_registration_order_is_run_order() {
        let mut w = world();
        let mut manager: SystemManager<TestWorld, ()> = SystemManager::new();
        manager
            .register_once(Record("first"))
            .register_once(Gated)
            .register_once(Record("last"));
        assert_eq!(manager.update_names(), vec!["first", "gated", "last"]);
        manager.update(&mut w, 0.1);
        assert_eq!(w.log, vec!["first", "gated", "last"]);

        w.log.clear();
        w.enabled = false;
        manager.update(&mut w, 0.1);
        assert_eq!(w.log, vec!["first", "last"]);
    }

    #[test]
    fn test_spawns_visible_after_system_and_cleanup_swept_at_tick_end() {
        let mut w = world();
        w.store.create().add(Counter(0));
        let mut manager: SystemManager<TestWorld, ()> = SystemManager::new();
        manager.register_for_each(Spawner);
        manager.update(&mut w, 0.1);
        // The spawning scan did not visit its own spawn.
        assert_eq!(w.store.len(), 2);
        let swept = manager.tick(&mut w, &mut (), 0.1);
        // Tick 2: only the unmarked spawn is visited and spawns again.
        assert_eq!(swept.len(), 2);
        assert_eq!(w.store.len(), 1);
    }

    #[test]
    fn test_entity_system_skips_entities_marked_for_cleanup() {
        let mut w = world();
        let doomed = {
            let e = w.store.create();
            e.add(Counter(1));
            e.add(Step(2));
            e.id
        };
        w.store.mark_for_cleanup(doomed);
        let mut manager: SystemManager<TestWorld, ()> = SystemManager::new();
        manager.register_for_each(AddStep);
        manager.update(&mut w, 0.1);
        assert_eq!(w.store.get_enforced(doomed).get::<Counter>().0, 1);
    }

    struct CountFrames;

    impl RenderSystem<TestWorld, Vec<usize>> for CountFrames {
        fn name(&self) -> &'static str {
            "count_frames"
        }

        fn render(&mut self, world: &TestWorld, frame: &mut Vec<usize>, _dt: f32) {
            frame.push(world.store.len());
        }
    }

    #[test]
    fn test_render_runs_after_update() {
        let mut w = world();
        struct Create;
        impl OnceSystem<TestWorld> for Create {
            fn name(&self) -> &'static str {
                "create"
            }
            fn once(&mut self, world: &mut TestWorld, _dt: f32) {
                world.store.create();
            }
        }
        let mut manager: SystemManager<TestWorld, Vec<usize>> = SystemManager::new();
        manager.register_render(CountFrames).register_once(Create);
        let mut frame = Vec::new();
        manager.tick(&mut w, &mut frame, 0.1);
        assert_eq!(frame, vec![1]);
        assert_eq!(manager.render_names(), vec!["count_frames"]);
    }
}
