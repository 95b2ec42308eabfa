//! # barkeep_ecs
//!
//! The entity-component-system core of the bar simulation.
//!
//! This crate provides:
//!
//! - [`Component`] trait and the process-wide [`get_type_id`] registry.
//! - [`Entity`]: ID, type, tags, cleanup mark and a component slot array.
//! - [`EntityStore`]: server/client collections, deferred cleanup, named
//!   singleton lookup.
//! - [`EntityQuery`]: a fluent filter/sort/limit builder.
//! - [`SystemManager`]: ordered update and render system lists.

pub mod component;
pub mod entity;
pub mod query;
pub mod store;
pub mod system;

pub use component::{
    AsAny, Component, ComponentSet, ComponentTypeId, MAX_COMPONENTS, get_type_id,
    registered_count,
};
pub use entity::{
    ComponentStorage, Entity, EntityId, EntityMeta, EntityType, MAX_TAGS, NamedEntity, TagId,
    TagSet,
};
pub use query::{EntityQuery, Modification};
pub use store::{EntityStore, ForEachFlow, GridCell, RunMode};
pub use system::{
    Commands, ComponentTuple, EntitySystem, OnceSystem, RenderSystem, SystemManager, WorldAccess,
};
