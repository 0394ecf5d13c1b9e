use commune_serde::{ByteReader, ByteWriter, Serde, SerdeError};

/// A replicated entity handle: the low 16 bits are the slot number, the high
/// 16 bits are the reuse generation ("version").
///
/// Equality requires both halves to match, so a handle kept across a
/// free/reallocate cycle of its slot never resolves to the new occupant's
/// data.
#[derive(PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
pub struct EntityId(u32);

/// The local player's fixed slot. Never recycled.
pub const LOCAL_PLAYER: EntityId = EntityId::new(1, 0);

/// First slot of the remote-player pool (inclusive).
pub const REMOTE_PLAYER_SLOT_FROM: u16 = 32;
/// End of the remote-player pool (exclusive).
pub const REMOTE_PLAYER_SLOT_TO: u16 = 256;
/// How many remote peers can hold a slot at once.
pub const REMOTE_PLAYER_POOL_CAPACITY: usize =
    (REMOTE_PLAYER_SLOT_TO - REMOTE_PLAYER_SLOT_FROM) as usize;

impl EntityId {
    pub const fn new(slot: u16, version: u16) -> Self {
        Self((slot as u32) | ((version as u32) << 16))
    }

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn as_raw(&self) -> u32 {
        self.0
    }

    pub const fn slot(&self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }

    pub const fn version(&self) -> u16 {
        (self.0 >> 16) as u16
    }

    /// True when the slot falls inside a reserved player range (the local
    /// player singleton or the remote-player pool). Makes no statement about
    /// whether the id is currently registered.
    pub const fn is_player_slot(&self) -> bool {
        let slot = self.slot();
        slot == LOCAL_PLAYER.slot()
            || (slot >= REMOTE_PLAYER_SLOT_FROM && slot < REMOTE_PLAYER_SLOT_TO)
    }
}

impl std::fmt::Debug for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "EntityId({}v{})", self.slot(), self.version())
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}v{}", self.slot(), self.version())
    }
}

impl Serde for EntityId {
    fn ser(&self, writer: &mut ByteWriter) {
        writer.write_u32(self.0);
    }
    fn de(reader: &mut ByteReader) -> Result<Self, SerdeError> {
        Ok(Self(reader.read_u32()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_slot_and_version() {
        let id = EntityId::new(33, 7);
        assert_eq!(id.slot(), 33);
        assert_eq!(id.version(), 7);
        assert_eq!(id.as_raw(), (7 << 16) | 33);
    }

    #[test]
    fn same_slot_different_version_are_distinct() {
        assert_ne!(EntityId::new(40, 0), EntityId::new(40, 1));
    }

    #[test]
    fn player_slot_ranges() {
        assert!(LOCAL_PLAYER.is_player_slot());
        assert!(EntityId::new(32, 0).is_player_slot());
        assert!(EntityId::new(255, 12).is_player_slot());
        assert!(!EntityId::new(256, 0).is_player_slot());
        assert!(!EntityId::new(2, 0).is_player_slot());
    }
}
