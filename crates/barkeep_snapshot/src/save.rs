//! Save files.

use std::fs;
use std::path::Path;

use barkeep_ecs::EntityStore;
use tracing::info;

use crate::codec::{apply_snapshot, encode_world};
use crate::error::SnapshotError;
use crate::fixups::FixupReport;

/// Writes a full snapshot of the store to `path`.
///
/// The file is written beside the target and renamed into place, so a
/// crash mid-write leaves the previous save intact.
///
/// # Errors
///
/// Returns [`SnapshotError::Io`] if the file cannot be written, or
/// [`SnapshotError::Encode`] if a component fails to serialise.
pub fn save_to_path(store: &EntityStore, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
    let path = path.as_ref();
    let bytes = encode_world(store)?;
    let partial = path.with_extension("partial");
    fs::write(&partial, &bytes)?;
    fs::rename(&partial, path)?;
    info!(path = %path.display(), entities = store.len(), bytes = bytes.len(), "saved world");
    Ok(())
}

/// Replaces the store's contents with the save at `path`.
///
/// # Errors
///
/// Returns [`SnapshotError::Io`] if the file cannot be read, or any decode
/// error from [`apply_snapshot`]. The store is untouched on error.
pub fn load_from_path(
    store: &mut EntityStore,
    path: impl AsRef<Path>,
) -> Result<FixupReport, SnapshotError> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    let report = apply_snapshot(store, &bytes)?;
    info!(path = %path.display(), entities = store.len(), repairs = report.len(), "loaded world");
    Ok(report)
}
