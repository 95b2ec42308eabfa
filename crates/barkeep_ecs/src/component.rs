//! Core [`Component`] trait and the process-wide component type registry.
//!
//! Every piece of data attached to an [`Entity`](crate::Entity) implements
//! [`Component`]. Each concrete type is assigned a small integer
//! [`ComponentTypeId`] the first time it is asked for one; the ID indexes the
//! per-entity slot array and the [`ComponentSet`] presence bitmap.
//!
//! ## Type identity
//!
//! IDs come from a monotonically increasing counter, so they are stable for
//! the lifetime of the process and identical across calls for the same type,
//! but they depend on first-use order. They are positional, not a wire
//! format: snapshots carry their own explicitly enumerated component kinds.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU8, Ordering};

use dashmap::DashMap;

/// Maximum number of distinct component types a process may register.
pub const MAX_COMPONENTS: usize = 64;

/// A small positional identifier for a component type.
///
/// Allocated lazily by [`get_type_id`]; always `< MAX_COMPONENTS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentTypeId(pub u8);

impl ComponentTypeId {
    /// Returns the slot index for this type.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns the [`ComponentTypeId`] for component type `T`.
    #[must_use]
    pub fn of<T: Component>() -> Self {
        get_type_id::<T>()
    }
}

impl fmt::Display for ComponentTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentTypeId({})", self.0)
    }
}

struct Registry {
    ids: DashMap<TypeId, ComponentTypeId>,
    next: AtomicU8,
}

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| Registry {
        ids: DashMap::new(),
        next: AtomicU8::new(0),
    })
}

/// Returns the process-wide [`ComponentTypeId`] for `T`, allocating one on
/// first use.
///
/// # Panics
///
/// Panics if more than [`MAX_COMPONENTS`] distinct types are registered.
#[must_use]
pub fn get_type_id<T: Component>() -> ComponentTypeId {
    let registry = registry();
    if let Some(id) = registry.ids.get(&TypeId::of::<T>()) {
        return *id;
    }
    // The entry lock makes allocation idempotent under concurrent first use.
    *registry
        .ids
        .entry(TypeId::of::<T>())
        .or_insert_with(|| {
            let raw = registry.next.fetch_add(1, Ordering::SeqCst);
            assert!(
                (raw as usize) < MAX_COMPONENTS,
                "component registry overflow: {} does not fit in {MAX_COMPONENTS} slots",
                T::type_name()
            );
            tracing::debug!(component = T::type_name(), id = raw, "registered component type");
            ComponentTypeId(raw)
        })
}

/// Returns the number of component types registered so far.
#[must_use]
pub fn registered_count() -> usize {
    registry().ids.len()
}

/// Upcasting helper so boxed components can be downcast to their concrete
/// type without `unsafe`.
pub trait AsAny: Any {
    /// Borrow as [`Any`].
    fn as_any(&self) -> &dyn Any;
    /// Mutably borrow as [`Any`].
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// The core component trait.
///
/// Components are plain data plus small behaviour, owned by exactly one
/// entity.
///
/// # Examples
///
/// ```rust
/// use barkeep_ecs::Component;
///
/// #[derive(Debug, Default)]
/// struct Patience {
///     remaining: f32,
/// }
///
/// impl Component for Patience {
///     fn type_name() -> &'static str { "Patience" }
/// }
/// ```
pub trait Component: AsAny + Send + Sync + fmt::Debug + 'static {
    /// A human-readable name for this component type.
    fn type_name() -> &'static str
    where
        Self: Sized;

    /// Returns the [`ComponentTypeId`] for this component.
    fn component_type_id() -> ComponentTypeId
    where
        Self: Sized,
    {
        get_type_id::<Self>()
    }
}

/// Fixed-size presence bitmap indexed by [`ComponentTypeId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ComponentSet(u64);

impl ComponentSet {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// Returns a set containing the given IDs.
    #[must_use]
    pub fn from_ids(ids: &[ComponentTypeId]) -> Self {
        ids.iter().fold(Self::EMPTY, |set, &id| set.with(id))
    }

    /// Returns a copy of this set with `id` added.
    #[must_use]
    pub const fn with(self, id: ComponentTypeId) -> Self {
        Self(self.0 | (1 << id.0))
    }

    /// Adds `id` to the set.
    pub fn insert(&mut self, id: ComponentTypeId) {
        self.0 |= 1 << id.0;
    }

    /// Removes `id` from the set.
    pub fn remove(&mut self, id: ComponentTypeId) {
        self.0 &= !(1 << id.0);
    }

    /// Returns `true` if `id` is in the set.
    #[must_use]
    pub const fn contains(self, id: ComponentTypeId) -> bool {
        self.0 & (1 << id.0) != 0
    }

    /// Returns `true` if every member of `other` is in this set.
    #[must_use]
    pub const fn contains_all(self, other: ComponentSet) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if the two sets share at least one member.
    #[must_use]
    pub const fn intersects(self, other: ComponentSet) -> bool {
        self.0 & other.0 != 0
    }

    /// Returns the number of members.
    #[must_use]
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Returns `true` if the set has no members.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Clears the set.
    pub fn clear(&mut self) {
        self.0 = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Health {
        current: f32,
    }

    impl Component for Health {
        fn type_name() -> &'static str {
            "Health"
        }
    }

    #[derive(Debug)]
    struct Velocity;

    impl Component for Velocity {
        fn type_name() -> &'static str {
            "Velocity"
        }
    }

    #[test]
    fn test_component_type_id_is_stable() {
        let id1 = Health::component_type_id();
        let id2 = Health::component_type_id();
        assert_eq!(id1, id2);
        assert_eq!(id1, get_type_id::<Health>());
    }

    #[test]
    fn test_component_type_id_differs_between_types() {
        assert_ne!(get_type_id::<Health>(), get_type_id::<Velocity>());
    }

    #[test]
    fn test_component_type_id_in_range() {
        let id = ComponentTypeId::of::<Health>();
        assert!(id.index() < MAX_COMPONENTS);
        assert!(registered_count() >= 1);
    }

    #[test]
    fn test_component_set_membership() {
        let a = ComponentTypeId(3);
        let b = ComponentTypeId(63);
        let mut set = ComponentSet::EMPTY.with(a);
        assert!(set.contains(a));
        assert!(!set.contains(b));
        set.insert(b);
        assert_eq!(set.len(), 2);
        assert!(set.contains_all(ComponentSet::from_ids(&[a, b])));
        set.remove(a);
        assert!(!set.contains(a));
        assert!(!set.contains_all(ComponentSet::from_ids(&[a, b])));
    }

    #[test]
    fn test_downcast_through_as_any() {
        let boxed: Box<dyn Component> = Box::new(Health { current: 80.0 });
        let health = (*boxed).as_any().downcast_ref::<Health>().unwrap();
        assert!((health.current - 80.0).abs() < f32::EPSILON);
        assert!((*boxed).as_any().downcast_ref::<Velocity>().is_none());
    }
}
