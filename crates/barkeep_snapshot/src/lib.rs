//! # barkeep_snapshot
//!
//! Binary snapshots of the entity store for save files and client/server
//! sync.
//!
//! This crate provides:
//!
//! - [`kinds`]: the append-only canonical component list.
//! - [`codec`]: full snapshots, single entities and deltas.
//! - [`fixups`]: reference repair after a batch is restored.
//! - [`save`]: save files on disk.
//! - [`error`]: snapshot error types.

pub mod codec;
pub mod error;
pub mod fixups;
pub mod kinds;
pub mod save;

pub use codec::{
    MAGIC, VERSION, apply_delta, apply_snapshot, decode_entities, decode_entity, encode_delta,
    encode_entity, encode_world,
};
pub use error::SnapshotError;
pub use fixups::{FixupReport, Repair, run_fixups};
pub use kinds::ComponentKind;
pub use save::{load_from_path, save_to_path};
