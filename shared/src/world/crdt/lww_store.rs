use std::collections::BTreeMap;

use commune_serde::{ByteReader, ByteWriter, Serde};

use crate::world::entity::EntityId;

use super::error::CrdtError;

/// One replicated entry: a live value or a tombstone, plus the clocks that
/// order it.
struct Entry<V> {
    /// `None` marks a tombstone left behind for other replicas to observe.
    value: Option<V>,
    /// Store-local monotone write counter; drives delta extraction.
    write_seq: u64,
    /// Externally supplied LWW timestamp, advanced by remote merges. Local
    /// writes move it forward lamport-style so a local replace is never
    /// shadowed by an older remote delta that arrives late.
    timestamp: u64,
}

/// A Last-Write-Wins element store for one component type.
///
/// Keys are exact [`EntityId`]s (slot + version), so writes addressed to a
/// recycled handle can never land on the slot's new occupant.
///
/// Delta extraction is per-subscriber: every consumer keeps its own watermark
/// (the value returned by [`dump_deltas`](Self::dump_deltas)) and pulls only
/// its own unseen window, so a scene-runtime bridge and a network replication
/// subscriber can drain the same store at different rates.
pub struct LwwComponentStore<V: Serde + Clone> {
    entries: BTreeMap<EntityId, Entry<V>>,
    next_seq: u64,
    /// Entities written since the last `dump_updates` call.
    dirty: Vec<EntityId>,
}

impl<V: Serde + Clone> LwwComponentStore<V> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_seq: 0,
            dirty: Vec::new(),
        }
    }

    fn stamp(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// Sets the live value for an entity, replacing any previous value or
    /// tombstone.
    pub fn create_or_replace(&mut self, entity: EntityId, value: V) {
        let seq = self.stamp();
        let timestamp = self
            .entries
            .get(&entity)
            .map(|e| e.timestamp + 1)
            .unwrap_or(1);
        self.entries.insert(
            entity,
            Entry {
                value: Some(value),
                write_seq: seq,
                timestamp,
            },
        );
        self.dirty.push(entity);
    }

    /// Tombstones the entity's entry. With `remove_completely` the entry is
    /// purged outright instead of leaving a tombstone for other replicas,
    /// which is what definitive entity removal (peer departure) wants.
    pub fn delete(&mut self, entity: EntityId, remove_completely: bool) {
        if remove_completely {
            self.entries.remove(&entity);
            self.dirty.retain(|e| *e != entity);
            return;
        }
        let seq = self.stamp();
        let timestamp = self
            .entries
            .get(&entity)
            .map(|e| e.timestamp + 1)
            .unwrap_or(1);
        self.entries.insert(
            entity,
            Entry {
                value: None,
                write_seq: seq,
                timestamp,
            },
        );
        self.dirty.push(entity);
    }

    /// Merges a remote write under the LWW rule: a strictly greater timestamp
    /// wins; an equal or older one leaves the resident entry untouched.
    /// Returns whether the write was applied.
    ///
    /// Tie-breaking across replicas is the replication bridge's contract;
    /// resident-wins on equality keeps this core deterministic without
    /// guessing that order.
    pub fn apply_remote(&mut self, entity: EntityId, value: Option<V>, timestamp: u64) -> bool {
        if let Some(existing) = self.entries.get(&entity) {
            if timestamp <= existing.timestamp {
                return false;
            }
        }
        let seq = self.stamp();
        self.entries.insert(
            entity,
            Entry {
                value,
                write_seq: seq,
                timestamp,
            },
        );
        self.dirty.push(entity);
        true
    }

    pub fn get(&self, entity: EntityId) -> Option<&V> {
        self.entries.get(&entity).and_then(|e| e.value.as_ref())
    }

    /// True when the entry exists only as a tombstone.
    pub fn is_deleted(&self, entity: EntityId) -> bool {
        matches!(self.entries.get(&entity), Some(Entry { value: None, .. }))
    }

    pub fn live_entities(&self) -> Vec<EntityId> {
        self.entries
            .iter()
            .filter(|(_, e)| e.value.is_some())
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.dirty.clear();
        self.next_seq = 0;
    }

    fn write_entry(writer: &mut ByteWriter, entity: EntityId, entry: &Entry<V>) {
        entity.ser(writer);
        match &entry.value {
            Some(value) => {
                writer.write_bool(false);
                let mut payload = ByteWriter::new();
                value.ser(&mut payload);
                writer.write_bytes(payload.as_slice());
            }
            None => writer.write_bool(true),
        }
    }

    /// Serializes every entry changed since `since` (a watermark previously
    /// returned by this method, or `0` for everything) in ascending-entity
    /// order. Returns the new watermark for this subscriber; it only advances
    /// when a change was actually observed.
    pub fn dump_deltas(&self, writer: &mut ByteWriter, since: u64) -> u64 {
        let mut new_watermark = since;
        for (entity, entry) in self.entries.iter() {
            if entry.write_seq <= since {
                continue;
            }
            Self::write_entry(writer, *entity, entry);
            if entry.write_seq > new_watermark {
                new_watermark = entry.write_seq;
            }
        }
        new_watermark
    }

    /// Serializes the entries dirtied since the previous call, then clears
    /// the dirty list. Per-frame housekeeping for the owning system; network
    /// subscribers use [`dump_deltas`](Self::dump_deltas) instead.
    pub fn dump_updates(&mut self, writer: &mut ByteWriter) {
        let mut seen = std::collections::HashSet::new();
        for entity in std::mem::take(&mut self.dirty) {
            if !seen.insert(entity) {
                continue;
            }
            if let Some(entry) = self.entries.get(&entity) {
                Self::write_entry(writer, entity, entry);
            }
        }
    }

    /// Serializes every live entry. Used for late-joining subscribers that
    /// need a full resync instead of a delta window.
    pub fn dump_full_state(&self, writer: &mut ByteWriter) {
        for (entity, entry) in self.entries.iter() {
            if entry.value.is_some() {
                Self::write_entry(writer, *entity, entry);
            }
        }
    }

    /// Replays a [`dump_full_state`](Self::dump_full_state) buffer into this
    /// store, returning the number of entries applied.
    pub fn apply_full_state(&mut self, reader: &mut ByteReader) -> Result<usize, CrdtError> {
        let mut applied = 0;
        while !reader.is_empty() {
            let entity = EntityId::de(reader)?;
            let tombstone = reader.read_bool()?;
            if tombstone {
                return Err(CrdtError::TombstoneInFullState {
                    entity: entity.to_string(),
                });
            }
            let payload = reader.read_bytes()?;
            let mut payload_reader = ByteReader::new(payload);
            let value = V::de(&mut payload_reader)?;
            self.create_or_replace(entity, value);
            applied += 1;
        }
        Ok(applied)
    }
}

impl<V: Serde + Clone> Default for LwwComponentStore<V> {
    fn default() -> Self {
        Self::new()
    }
}
