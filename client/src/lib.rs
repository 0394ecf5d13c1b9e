//! # Commune Client
//! Client-side synchronization layer for a shared virtual-world session.
//!
//! The pieces, leaves first:
//! - [`transport`]: one event-driven interface over heterogeneous room
//!   protocols (reliable multicast rooms and plain socket rooms).
//! - [`comms`]: the avatar/peer synchronization system that turns transport
//!   events into LWW component writes and outbound replication deltas.
//! - [`realm`]: realm resolution, adapter negotiation, and the orchestrator
//!   that reconciles desired transports against active ones each tick.
//!
//! All state mutation happens on one logical execution context; network I/O
//! is pushed onto spawned tasks whose completions are polled from the tick.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub mod comms;
pub mod identity;
pub mod realm;
pub mod transport;

pub use commune_shared::{
    AllocError, ByteReader, ByteWriter, Color3, CrdtError, EntityId, LwwComponentStore,
    PlayerEntityAllocator, Quaternion, Serde, SerdeError, Vector3, LOCAL_PLAYER,
    REMOTE_PLAYER_POOL_CAPACITY, REMOTE_PLAYER_SLOT_FROM, REMOTE_PLAYER_SLOT_TO,
};
