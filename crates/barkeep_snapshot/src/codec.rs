//! Binary snapshot encoding.
//!
//! Layout (integers little endian):
//!
//! ```text
//! header   "BKSN" version:u32 kinds:u16 count:u32
//! record   id:i32 type:i32 tags:u64 cleanup:u8 { presence:u8 payload? } x kinds
//! ```
//!
//! Payloads are MessagePack. Cross-entity links travel as plain integer IDs
//! and are checked by [`run_fixups`] once the whole batch is in the store.
//! A reader accepts data written with fewer kinds than it knows; the
//! missing trailing kinds read as absent.

use std::collections::HashSet;
use std::io::{Read, Write};

use barkeep_ecs::{Entity, EntityId, EntityStore, EntityType, NamedEntity, TagSet};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use tracing::{debug, info};

use crate::error::SnapshotError;
use crate::fixups::{FixupReport, run_fixups};
use crate::kinds::{ComponentKind, known_kinds};

/// Leading bytes of every snapshot.
pub const MAGIC: [u8; 4] = *b"BKSN";

/// Current format version.
pub const VERSION: u32 = 1;

// ── Header ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct Header {
    kinds: u16,
    count: u32,
}

fn write_header(out: &mut impl Write, count: usize) -> Result<(), SnapshotError> {
    out.write_all(&MAGIC)?;
    out.write_u32::<LittleEndian>(VERSION)?;
    out.write_u16::<LittleEndian>(known_kinds())?;
    out.write_u32::<LittleEndian>(count as u32)?;
    Ok(())
}

fn read_kinds(input: &mut impl Read) -> Result<u16, SnapshotError> {
    let kinds = input.read_u16::<LittleEndian>()?;
    if kinds > known_kinds() {
        return Err(SnapshotError::TooManyKinds {
            found: kinds,
            known: known_kinds(),
        });
    }
    Ok(kinds)
}

fn read_header(input: &mut impl Read) -> Result<Header, SnapshotError> {
    let mut magic = [0; 4];
    input.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(SnapshotError::BadMagic(magic));
    }
    let version = input.read_u32::<LittleEndian>()?;
    if version > VERSION {
        return Err(SnapshotError::UnsupportedVersion {
            found: version,
            supported: VERSION,
        });
    }
    let kinds = read_kinds(input)?;
    let count = input.read_u32::<LittleEndian>()?;
    Ok(Header { kinds, count })
}

// ── Records ─────────────────────────────────────────────────────────────────

fn write_record(entity: &Entity, out: &mut impl Write) -> Result<(), SnapshotError> {
    out.write_i32::<LittleEndian>(entity.id.raw())?;
    out.write_i32::<LittleEndian>(entity.entity_type as i32)?;
    out.write_u64::<LittleEndian>(entity.tags.0)?;
    out.write_u8(u8::from(entity.cleanup))?;
    for kind in ComponentKind::ALL {
        kind.write(entity, out)?;
    }
    Ok(())
}

fn read_record(input: &mut impl Read, kinds: u16) -> Result<Entity, SnapshotError> {
    let id = EntityId(input.read_i32::<LittleEndian>()?);
    let raw_type = input.read_i32::<LittleEndian>()?;
    let entity_type = EntityType::try_from(raw_type).map_err(SnapshotError::UnknownEntityType)?;
    let mut entity = Entity::with_id(id).of_type(entity_type);
    entity.tags = TagSet(input.read_u64::<LittleEndian>()?);
    entity.cleanup = input.read_u8()? != 0;
    for kind in &ComponentKind::ALL[..usize::from(kinds)] {
        kind.read(&mut entity, input)?;
    }
    Ok(entity)
}

fn read_records(input: &mut impl Read, header: Header) -> Result<Vec<Entity>, SnapshotError> {
    let mut seen = HashSet::new();
    let mut entities = Vec::new();
    for _ in 0..header.count {
        let entity = read_record(input, header.kinds)?;
        if !seen.insert(entity.id) {
            return Err(SnapshotError::DuplicateEntity(entity.id));
        }
        entities.push(entity);
    }
    Ok(entities)
}

// ── Full snapshots ──────────────────────────────────────────────────────────

/// Encodes every entity in the store's active collection.
///
/// # Errors
///
/// Returns [`SnapshotError::Encode`] if a component payload fails to
/// serialise.
pub fn encode_world(store: &EntityStore) -> Result<Vec<u8>, SnapshotError> {
    let mut out = Vec::new();
    write_header(&mut out, store.len())?;
    for entity in store.iter() {
        write_record(entity, &mut out)?;
    }
    debug!(entities = store.len(), bytes = out.len(), "encoded world");
    Ok(out)
}

/// Decodes a full snapshot into detached entities. No fixups run; use
/// [`apply_snapshot`] to restore a store.
///
/// # Errors
///
/// Returns an error on truncated data, a bad header, an unknown entity
/// type, a repeated entity ID, or a payload that fails to deserialise.
pub fn decode_entities(bytes: &[u8]) -> Result<Vec<Entity>, SnapshotError> {
    let mut input = bytes;
    let header = read_header(&mut input)?;
    read_records(&mut input, header)
}

/// Replaces the store's active collection with the snapshot's entities,
/// then runs fixups and advances the ID generator past every loaded ID.
///
/// The store is left untouched when decoding fails.
///
/// # Errors
///
/// See [`decode_entities`].
pub fn apply_snapshot(store: &mut EntityStore, bytes: &[u8]) -> Result<FixupReport, SnapshotError> {
    let entities = decode_entities(bytes)?;
    let count = entities.len();
    store.delete_all(true);
    insert_all(store, entities);
    let report = run_fixups(store);
    info!(entities = count, repairs = report.len(), "applied snapshot");
    Ok(report)
}

fn insert_all(store: &mut EntityStore, entities: Vec<Entity>) {
    let mut max_id = None;
    for entity in entities {
        let id = entity.id;
        let singleton = entity.entity_type == NamedEntity::Sophie.entity_type();
        max_id = max_id.max(Some(id));
        store.insert(entity);
        if singleton {
            store.make_permanent(id);
        }
    }
    if let Some(id) = max_id {
        EntityId::advance_past(id);
    }
}

// ── Single entities ─────────────────────────────────────────────────────────

/// Encodes one entity for network sync: `kinds:u16` followed by a record.
///
/// # Errors
///
/// Returns [`SnapshotError::Encode`] if a component payload fails to
/// serialise.
pub fn encode_entity(entity: &Entity) -> Result<Vec<u8>, SnapshotError> {
    let mut out = Vec::new();
    out.write_u16::<LittleEndian>(known_kinds())?;
    write_record(entity, &mut out)?;
    Ok(out)
}

/// Decodes one entity written by [`encode_entity`].
///
/// # Errors
///
/// See [`decode_entities`].
pub fn decode_entity(bytes: &[u8]) -> Result<Entity, SnapshotError> {
    let mut input = bytes;
    let kinds = read_kinds(&mut input)?;
    read_record(&mut input, kinds)
}

// ── Deltas ──────────────────────────────────────────────────────────────────

/// Encodes the given entities plus a list of removed IDs.
///
/// Layout: a full snapshot of `changed` followed by
/// `removed_count:u32 { id:i32 }`. IDs in `changed` that are not live are
/// skipped.
///
/// # Errors
///
/// Returns [`SnapshotError::Encode`] if a component payload fails to
/// serialise.
pub fn encode_delta(
    store: &EntityStore,
    changed: &[EntityId],
    removed: &[EntityId],
) -> Result<Vec<u8>, SnapshotError> {
    let entities: Vec<&Entity> = changed
        .iter()
        .filter_map(|id| store.get_by_id(*id))
        .collect();
    let mut out = Vec::new();
    write_header(&mut out, entities.len())?;
    for entity in &entities {
        write_record(entity, &mut out)?;
    }
    out.write_u32::<LittleEndian>(removed.len() as u32)?;
    for id in removed {
        out.write_i32::<LittleEndian>(id.raw())?;
    }
    debug!(
        changed = entities.len(),
        removed = removed.len(),
        bytes = out.len(),
        "encoded delta"
    );
    Ok(out)
}

/// Upserts the delta's entities by ID, removes its removed IDs, then runs
/// fixups over the whole store.
///
/// The store is left untouched when decoding fails.
///
/// # Errors
///
/// See [`decode_entities`].
pub fn apply_delta(store: &mut EntityStore, bytes: &[u8]) -> Result<FixupReport, SnapshotError> {
    let mut input = bytes;
    let header = read_header(&mut input)?;
    let entities = read_records(&mut input, header)?;
    let removed_count = input.read_u32::<LittleEndian>()?;
    let removed = (0..removed_count)
        .map(|_| input.read_i32::<LittleEndian>().map(EntityId))
        .collect::<Result<HashSet<_>, _>>()?;

    let mut upserted = 0;
    let mut permanent = Vec::new();
    for entity in &entities {
        if store.is_permanent(entity.id) {
            permanent.push(entity.id);
        }
        if store.remove(entity.id).is_some() {
            upserted += 1;
        }
    }
    let changed = entities.len();
    insert_all(store, entities);
    for id in permanent {
        store.make_permanent(id);
    }
    for id in &removed {
        if store.remove(*id).is_none() {
            debug!(entity = %id, "delta removes unknown entity");
        }
    }
    let report = run_fixups(store);
    debug!(
        changed,
        upserted,
        removed = removed.len(),
        repairs = report.len(),
        "applied delta"
    );
    Ok(report)
}
