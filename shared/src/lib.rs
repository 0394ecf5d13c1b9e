//! # Commune Shared
//! Common functionality shared between the commune client and any host that
//! replays its replication dumps: bit-packed entity identity with
//! version-based reuse, and the Last-Write-Wins component store used as the
//! convergence primitive.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub use commune_serde::{ByteReader, ByteWriter, Serde, SerdeError};

mod types;
mod world;

pub use types::{Color3, Quaternion, Vector3};
pub use world::{
    crdt::{CrdtError, LwwComponentStore},
    entity::{
        AllocError, EntityId, PlayerEntityAllocator, LOCAL_PLAYER, REMOTE_PLAYER_POOL_CAPACITY,
        REMOTE_PLAYER_SLOT_FROM, REMOTE_PLAYER_SLOT_TO,
    },
};
