use std::collections::{BTreeMap, HashMap, HashSet};

use log::{info, warn};

use super::{
    entity_id::{EntityId, LOCAL_PLAYER, REMOTE_PLAYER_SLOT_FROM, REMOTE_PLAYER_SLOT_TO},
    error::AllocError,
    REMOTE_PLAYER_POOL_CAPACITY,
};

/// Allocates the reserved player [`EntityId`] ranges for a session.
///
/// The local player always receives the fixed singleton id. Remote peers draw
/// from the `[32, 256)` slot pool; freed slots are reused by bumping their
/// version, which invalidates any handle issued for a previous occupant.
///
/// This is a plain service object owned by the session (one per connected
/// scope), never a process-wide singleton.
pub struct PlayerEntityAllocator {
    live: HashSet<EntityId>,
    address_to_entity: HashMap<String, EntityId>,
    entity_to_address: HashMap<EntityId, String>,
    // slot -> highest version issued so far. BTreeMap keeps reuse scans in
    // slot order, which makes allocation deterministic.
    slot_versions: BTreeMap<u16, u16>,
    next_slot: u16,
}

impl PlayerEntityAllocator {
    pub fn new() -> Self {
        Self {
            live: HashSet::new(),
            address_to_entity: HashMap::new(),
            entity_to_address: HashMap::new(),
            slot_versions: BTreeMap::new(),
            next_slot: REMOTE_PLAYER_SLOT_FROM,
        }
    }

    /// Allocates (or returns the already-live) entity for a peer address.
    ///
    /// Idempotent per address: calling twice without an intervening
    /// [`free`](Self::free) returns the same id and mutates no version state.
    pub fn allocate(&mut self, address: &str, is_local: bool) -> Result<EntityId, AllocError> {
        let address = normalize_address(address);

        if let Some(existing) = self.address_to_entity.get(&address) {
            return Ok(*existing);
        }

        if is_local {
            self.address_to_entity.insert(address.clone(), LOCAL_PLAYER);
            self.entity_to_address.insert(LOCAL_PLAYER, address.clone());
            info!("allocated local player entity {LOCAL_PLAYER} for {address}");
            return Ok(LOCAL_PLAYER);
        }

        // Prefer reusing a freed slot with a bumped version. Slots whose
        // version counter reached the u16 ceiling are skipped: wraparound
        // would resurrect stale handles.
        for (&slot, &version) in self.slot_versions.iter() {
            if version == u16::MAX {
                continue;
            }
            let candidate = EntityId::new(slot, version + 1);
            if self.live.contains(&candidate) {
                continue;
            }
            if self.live.contains(&EntityId::new(slot, version)) {
                // Current occupant still holds the slot.
                continue;
            }
            self.slot_versions.insert(slot, version + 1);
            self.register(address, candidate);
            info!("reused slot {slot} at version {} for peer", version + 1);
            return Ok(candidate);
        }

        // Otherwise take a fresh slot from the bounded pool.
        if self.next_slot < REMOTE_PLAYER_SLOT_TO {
            let slot = self.next_slot;
            self.next_slot += 1;
            let entity = EntityId::new(slot, 0);
            self.slot_versions.insert(slot, 0);
            self.register(address, entity);
            return Ok(entity);
        }

        warn!("no available entity slots for remote players");
        Err(AllocError::PoolExhausted {
            capacity: REMOTE_PLAYER_POOL_CAPACITY,
        })
    }

    fn register(&mut self, address: String, entity: EntityId) {
        self.live.insert(entity);
        self.address_to_entity.insert(address.clone(), entity);
        self.entity_to_address.insert(entity, address);
    }

    /// Releases the entity mapped to an address. Freeing an unmapped address
    /// is a no-op.
    ///
    /// The local player's slot is permanent: only its address mapping is
    /// cleared. Remote slots leave the live set but retain their version
    /// counter so the next occupant gets a strictly greater version.
    pub fn free(&mut self, address: &str) {
        let address = normalize_address(address);
        let Some(entity) = self.address_to_entity.remove(&address) else {
            return;
        };
        self.entity_to_address.remove(&entity);

        if entity == LOCAL_PLAYER {
            info!("cleared local player mapping for {address}");
            return;
        }

        let slot = entity.slot();
        if slot >= REMOTE_PLAYER_SLOT_FROM && slot < REMOTE_PLAYER_SLOT_TO {
            self.live.remove(&entity);
            // slot_versions entry stays behind for reuse.
        }
    }

    pub fn entity_for_address(&self, address: &str) -> Option<EntityId> {
        self.address_to_entity
            .get(&normalize_address(address))
            .copied()
    }

    pub fn address_for_entity(&self, entity: EntityId) -> Option<&str> {
        self.entity_to_address.get(&entity).map(String::as_str)
    }

    /// True iff the id falls in a reserved player range and is currently
    /// registered. Stale ids (wrong version for their slot) always fail.
    pub fn is_player_entity(&self, entity: EntityId) -> bool {
        if !entity.is_player_slot() {
            return false;
        }
        self.entity_to_address.contains_key(&entity)
    }

    /// Every currently registered (entity, address) pair.
    pub fn live_entities(&self) -> impl Iterator<Item = (EntityId, &str)> {
        self.entity_to_address
            .iter()
            .map(|(entity, address)| (*entity, address.as_str()))
    }

    pub fn live_count(&self) -> usize {
        self.entity_to_address.len()
    }

    /// Resets all allocator state to initial. Used on full disconnect.
    pub fn clear(&mut self) {
        self.live.clear();
        self.address_to_entity.clear();
        self.entity_to_address.clear();
        self.slot_versions.clear();
        self.next_slot = REMOTE_PLAYER_SLOT_FROM;
    }
}

impl Default for PlayerEntityAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Peer addresses are compared case-insensitively everywhere; lowercase once
/// at the boundary.
pub(crate) fn normalize_address(address: &str) -> String {
    address.to_lowercase()
}
