//! Snapshot error types.

/// Errors that can occur while writing or reading snapshots.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// Reading or writing the underlying buffer or file failed.
    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A component payload could not be encoded.
    #[error("failed to encode component: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// A component payload could not be decoded.
    #[error("failed to decode component: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// The data does not start with the snapshot magic.
    #[error("not a snapshot (bad magic {0:02x?})")]
    BadMagic([u8; 4]),

    /// The data was written by a newer format version.
    #[error("unsupported snapshot version {found} (max {supported})")]
    UnsupportedVersion {
        /// Version in the header.
        found: u32,
        /// Highest version this build reads.
        supported: u32,
    },

    /// An entity record carries a type discriminator this build lacks.
    #[error("unknown entity type discriminator {0}")]
    UnknownEntityType(i32),

    /// Two records in one batch share an entity ID.
    #[error("entity {0} appears more than once")]
    DuplicateEntity(barkeep_ecs::EntityId),

    /// The writer knew more component kinds than this build.
    #[error("snapshot has {found} component kinds, this build knows {known}")]
    TooManyKinds {
        /// Kind count in the header.
        found: u16,
        /// Kinds this build knows.
        known: u16,
    },
}
