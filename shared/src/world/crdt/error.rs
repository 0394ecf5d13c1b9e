use commune_serde::SerdeError;
use thiserror::Error;

/// Errors that can occur while replaying replication dumps into a store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CrdtError {
    /// The dump's wire encoding could not be decoded
    #[error("Malformed replication dump: {0}")]
    Malformed(#[from] SerdeError),

    /// A full-state dump carried a tombstone entry, which it never should
    #[error("Full-state dump contained a tombstone for entity {entity}")]
    TombstoneInFullState { entity: String },
}
