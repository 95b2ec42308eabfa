//! Entity type, identifiers and per-entity component storage.
//!
//! An [`Entity`] is an [`EntityId`] plus a small header (kind, tags, cleanup
//! mark) and a fixed-size slot array holding at most one component of each
//! registered type.

use std::fmt;
use std::sync::atomic::{AtomicI32, Ordering};

use serde::{Deserialize, Serialize};

use crate::component::{Component, ComponentSet, ComponentTypeId, MAX_COMPONENTS, get_type_id};

static NEXT_ENTITY_ID: AtomicI32 = AtomicI32::new(1);

/// A unique entity identifier.
///
/// IDs come from a process-wide monotonic generator and are never reused
/// within a process run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub i32);

impl EntityId {
    /// The null / invalid entity sentinel.
    pub const INVALID: EntityId = EntityId(-1);

    /// Allocates a fresh entity ID.
    pub fn generate() -> Self {
        Self(NEXT_ENTITY_ID.fetch_add(1, Ordering::SeqCst))
    }

    /// Makes sure every ID generated from now on is greater than `id`.
    ///
    /// Called after restoring entities whose IDs were allocated by another
    /// process (save files, server snapshots).
    pub fn advance_past(id: EntityId) {
        NEXT_ENTITY_ID.fetch_max(id.0.saturating_add(1), Ordering::SeqCst);
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Returns `true` if this is not [`EntityId::INVALID`].
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 >= 0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

macro_rules! entity_types {
    ($($name:ident = $value:literal),+ $(,)?) => {
        /// Closed set of entity kinds.
        ///
        /// The discriminant is the on-wire value; never renumber existing
        /// entries.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        #[repr(i32)]
        pub enum EntityType {
            #[default]
            $($name = $value),+
        }

        impl EntityType {
            /// Every entity type, in discriminant order.
            pub const ALL: &'static [EntityType] = &[$(EntityType::$name),+];

            /// Returns the type's name.
            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $(EntityType::$name => stringify!($name)),+
                }
            }
        }

        impl TryFrom<i32> for EntityType {
            type Error = i32;

            fn try_from(value: i32) -> Result<Self, Self::Error> {
                match value {
                    $($value => Ok(EntityType::$name),)+
                    other => Err(other),
                }
            }
        }
    };
}

entity_types! {
    Unknown = 0,
    RemotePlayer = 1,
    Player = 2,
    Customer = 3,
    Table = 4,
    Wall = 5,
    Conveyer = 6,
    Grabber = 7,
    Register = 8,
    TriggerArea = 9,
    CustomerSpawner = 10,
    Sophie = 11,
    Blender = 12,
    SodaMachine = 13,
    Cupboard = 14,
    Squirter = 15,
    Toilet = 16,
    Vomit = 17,
    MopHolder = 18,
    Door = 19,
    SodaSpout = 20,
    Drink = 21,
    Alcohol = 22,
    Fruit = 23,
    FruitJuice = 24,
    SimpleSyrup = 25,
    Mop = 26,
    StoreItem = 27,
    Trash = 28,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Well-known singleton entities resolvable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedEntity {
    /// Holder of the round timer, bank and progression state.
    Sophie,
}

impl NamedEntity {
    /// The entity type that identifies this singleton.
    #[must_use]
    pub const fn entity_type(self) -> EntityType {
        match self {
            NamedEntity::Sophie => EntityType::Sophie,
        }
    }
}

/// Index of a free-form tag bit.
pub type TagId = u8;

/// Number of tag bits an entity carries.
pub const MAX_TAGS: usize = 64;

/// Fixed-size bitset of free-form semantic tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TagSet(pub u64);

impl TagSet {
    /// No tags.
    pub const EMPTY: Self = Self(0);

    /// Returns a set containing the given tags.
    #[must_use]
    pub fn from_tags(tags: &[TagId]) -> Self {
        let mut set = Self::EMPTY;
        for &tag in tags {
            set.enable(tag);
        }
        set
    }

    /// Sets `tag`.
    pub fn enable(&mut self, tag: TagId) {
        debug_assert!((tag as usize) < MAX_TAGS, "tag {tag} out of range");
        self.0 |= 1 << tag;
    }

    /// Clears `tag`.
    pub fn disable(&mut self, tag: TagId) {
        self.0 &= !(1 << tag);
    }

    /// Returns `true` if `tag` is set.
    #[must_use]
    pub const fn has(self, tag: TagId) -> bool {
        self.0 & (1 << tag) != 0
    }

    /// Returns `true` if every tag in `other` is set.
    #[must_use]
    pub const fn contains_all(self, other: TagSet) -> bool {
        self.0 & other.0 == other.0
    }
}

/// Fixed-size slot array of components indexed by [`ComponentTypeId`].
pub struct ComponentStorage {
    set: ComponentSet,
    slots: Vec<Option<Box<dyn Component>>>,
}

impl ComponentStorage {
    fn new() -> Self {
        Self {
            set: ComponentSet::EMPTY,
            slots: std::iter::repeat_with(|| None).take(MAX_COMPONENTS).collect(),
        }
    }

    /// Presence bitmap of the stored components.
    #[must_use]
    pub fn set(&self) -> ComponentSet {
        self.set
    }

    /// Returns the component of type `T`, if present.
    #[must_use]
    pub fn get<T: Component>(&self) -> Option<&T> {
        self.slots[get_type_id::<T>().index()]
            .as_deref()
            .and_then(|c| c.as_any().downcast_ref::<T>())
    }

    /// Returns the component of type `T` mutably, if present.
    #[must_use]
    pub fn get_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.slots[get_type_id::<T>().index()]
            .as_deref_mut()
            .and_then(|c| c.as_any_mut().downcast_mut::<T>())
    }

    /// Borrows several distinct slots mutably at once.
    ///
    /// Returns `None` if any ID repeats; absent slots come back as `None`.
    #[must_use]
    pub fn slots_disjoint_mut<const N: usize>(
        &mut self,
        ids: [ComponentTypeId; N],
    ) -> Option<[Option<&mut dyn Component>; N]> {
        let slots = self.slots.get_disjoint_mut(ids.map(ComponentTypeId::index)).ok()?;
        Some(slots.map(|slot| slot.as_deref_mut()))
    }

    fn insert(&mut self, id: ComponentTypeId, component: Box<dyn Component>) {
        self.slots[id.index()] = Some(component);
        self.set.insert(id);
    }

    fn remove(&mut self, id: ComponentTypeId) -> bool {
        self.set.remove(id);
        self.slots[id.index()].take().is_some()
    }

    fn clear(&mut self) {
        self.set.clear();
        for slot in &mut self.slots {
            *slot = None;
        }
    }
}

impl fmt::Debug for ComponentStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.slots.iter().flatten()).finish()
    }
}

/// Mutable view of an entity's header, handed to per-entity systems next to
/// the component references borrowed from the same entity.
#[derive(Debug)]
pub struct EntityMeta<'e> {
    /// The entity's ID.
    pub id: EntityId,
    /// The entity's kind.
    pub entity_type: EntityType,
    /// The entity's tags.
    pub tags: &'e mut TagSet,
    /// The entity's soft-delete mark.
    pub cleanup: &'e mut bool,
}

/// A live entity.
#[derive(Debug)]
pub struct Entity {
    /// Unique identifier.
    pub id: EntityId,
    /// Kind discriminator.
    pub entity_type: EntityType,
    /// Free-form semantic tags.
    pub tags: TagSet,
    /// Soft-delete marker; swept by the store at the end of the tick.
    pub cleanup: bool,
    components: ComponentStorage,
}

impl Entity {
    /// Creates an empty entity with a freshly generated ID.
    #[must_use]
    pub fn new() -> Self {
        Self::with_id(EntityId::generate())
    }

    /// Creates an empty entity with an explicit ID.
    ///
    /// Used when restoring entities from a snapshot; the caller is
    /// responsible for uniqueness.
    #[must_use]
    pub fn with_id(id: EntityId) -> Self {
        Self {
            id,
            entity_type: EntityType::Unknown,
            tags: TagSet::EMPTY,
            cleanup: false,
            components: ComponentStorage::new(),
        }
    }

    /// Sets the entity type, builder style.
    #[must_use]
    pub fn of_type(mut self, entity_type: EntityType) -> Self {
        self.entity_type = entity_type;
        self
    }

    /// Presence bitmap of the attached components.
    #[must_use]
    pub fn component_set(&self) -> ComponentSet {
        self.components.set()
    }

    /// Returns `true` if a component with the given type ID is attached.
    #[must_use]
    pub fn has_type_id(&self, id: ComponentTypeId) -> bool {
        self.components.set().contains(id)
    }

    /// Returns `true` if a `T` is attached.
    #[must_use]
    pub fn has<T: Component>(&self) -> bool {
        self.has_type_id(get_type_id::<T>())
    }

    /// Returns `true` if no `T` is attached.
    #[must_use]
    pub fn is_missing<T: Component>(&self) -> bool {
        !self.has::<T>()
    }

    /// Attaches `component` and returns a reference to it.
    ///
    /// # Panics
    ///
    /// Panics if a `T` is already attached; one entity holds at most one
    /// component of each type.
    pub fn add<T: Component>(&mut self, component: T) -> &mut T {
        let id = get_type_id::<T>();
        if self.has_type_id(id) {
            tracing::error!(entity = %self.id, component = T::type_name(), "component already attached");
            panic!("{} already has a {}", self.id, T::type_name());
        }
        self.components.insert(id, Box::new(component));
        self.get_mut::<T>()
    }

    /// Attaches `component` unless a `T` is already present, and returns the
    /// attached instance either way.
    pub fn add_if_missing<T: Component>(&mut self, component: T) -> &mut T {
        if self.is_missing::<T>() {
            self.components.insert(get_type_id::<T>(), Box::new(component));
        }
        self.get_mut::<T>()
    }

    /// Returns the attached `T`, or `None`.
    #[must_use]
    pub fn try_get<T: Component>(&self) -> Option<&T> {
        self.components.get::<T>()
    }

    /// Returns the attached `T` mutably, or `None`.
    #[must_use]
    pub fn try_get_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.components.get_mut::<T>()
    }

    /// Returns the attached `T`.
    ///
    /// # Panics
    ///
    /// Panics if no `T` is attached. Use [`Entity::try_get`] when absence
    /// is expected.
    #[must_use]
    pub fn get<T: Component>(&self) -> &T {
        match self.components.get::<T>() {
            Some(component) => component,
            None => missing_component::<T>(self.id),
        }
    }

    /// Returns the attached `T` mutably.
    ///
    /// # Panics
    ///
    /// Panics if no `T` is attached.
    pub fn get_mut<T: Component>(&mut self) -> &mut T {
        let id = self.id;
        match self.components.get_mut::<T>() {
            Some(component) => component,
            None => missing_component::<T>(id),
        }
    }

    /// Detaches the `T`, returning `true` if one was attached.
    pub fn remove<T: Component>(&mut self) -> bool {
        self.components.remove(get_type_id::<T>())
    }

    /// Detaches every component.
    pub fn clear_components(&mut self) {
        self.components.clear();
    }

    /// Sets a tag.
    pub fn enable_tag(&mut self, tag: TagId) {
        self.tags.enable(tag);
    }

    /// Clears a tag.
    pub fn disable_tag(&mut self, tag: TagId) {
        self.tags.disable(tag);
    }

    /// Returns `true` if the tag is set.
    #[must_use]
    pub fn has_tag(&self, tag: TagId) -> bool {
        self.tags.has(tag)
    }

    /// Splits the entity into its header view and its component storage so
    /// both can be borrowed mutably at the same time.
    pub fn split_mut(&mut self) -> (EntityMeta<'_>, &mut ComponentStorage) {
        (
            EntityMeta {
                id: self.id,
                entity_type: self.entity_type,
                tags: &mut self.tags,
                cleanup: &mut self.cleanup,
            },
            &mut self.components,
        )
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::new()
    }
}

#[cold]
fn missing_component<T: Component>(id: EntityId) -> ! {
    tracing::error!(entity = %id, component = T::type_name(), "component requested but absent");
    panic!("{id} has no {}", T::type_name())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Name(String);

    impl Component for Name {
        fn type_name() -> &'static str {
            "Name"
        }
    }

    #[derive(Debug, Default)]
    struct Speed(f32);

    impl Component for Speed {
        fn type_name() -> &'static str {
            "Speed"
        }
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = EntityId::generate();
        let b = EntityId::generate();
        assert_ne!(a, b);
        assert!(b > a);
        assert!(a.is_valid());
        assert!(!EntityId::INVALID.is_valid());
    }

    #[test]
    fn test_advance_past_skips_restored_ids() {
        let restored = EntityId(EntityId::generate().raw() + 1000);
        EntityId::advance_past(restored);
        assert!(EntityId::generate() > restored);
    }

    #[test]
    fn test_add_has_get_remove_round_trip() {
        let mut e = Entity::new();
        assert!(!e.has::<Name>());
        e.add(Name("Test".into()));
        assert!(e.has::<Name>());
        assert_eq!(e.get::<Name>(), &Name("Test".into()));
        assert!(e.remove::<Name>());
        assert!(e.is_missing::<Name>());
        assert!(!e.remove::<Name>());
    }

    #[test]
    #[should_panic(expected = "already has")]
    fn test_duplicate_add_panics() {
        let mut e = Entity::new();
        e.add(Speed(1.0));
        e.add(Speed(2.0));
    }

    #[test]
    #[should_panic(expected = "has no Speed")]
    fn test_get_absent_panics() {
        let e = Entity::new();
        let _ = e.get::<Speed>();
    }

    #[test]
    fn test_add_if_missing_keeps_existing() {
        let mut e = Entity::new();
        e.add(Speed(1.0));
        e.add_if_missing(Speed(5.0));
        assert!((e.get::<Speed>().0 - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_tags() {
        let mut e = Entity::new();
        e.enable_tag(0);
        e.enable_tag(5);
        e.enable_tag(63);
        assert!(e.has_tag(5));
        assert!(!e.has_tag(1));
        e.disable_tag(5);
        assert!(!e.has_tag(5));
        assert_eq!(e.tags, TagSet::from_tags(&[0, 63]));
    }

    #[test]
    fn test_entity_type_discriminant_round_trip() {
        for &ty in EntityType::ALL {
            assert_eq!(EntityType::try_from(ty as i32), Ok(ty));
        }
        assert_eq!(EntityType::try_from(9999), Err(9999));
    }

    #[test]
    fn test_disjoint_slots() {
        let mut e = Entity::new();
        e.add(Speed(2.0));
        e.add(Name("x".into()));
        let (_, storage) = e.split_mut();
        let [speed, name] = storage
            .slots_disjoint_mut([get_type_id::<Speed>(), get_type_id::<Name>()])
            .unwrap();
        assert!(speed.is_some());
        assert!(name.is_some());
        assert!(storage_repeat_is_rejected());
    }

    fn storage_repeat_is_rejected() -> bool {
        let mut e = Entity::new();
        e.add(Speed(2.0));
        let id = get_type_id::<Speed>();
        e.split_mut().1.slots_disjoint_mut([id, id]).is_none()
    }
}
