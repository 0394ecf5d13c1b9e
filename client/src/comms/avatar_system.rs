use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, RwLock},
};

use log::{debug, info, warn};
use tokio::sync::oneshot;

use commune_serde::ByteWriter;
use commune_shared::{
    EntityId, LwwComponentStore, PlayerEntityAllocator, REMOTE_PLAYER_SLOT_FROM,
    REMOTE_PLAYER_SLOT_TO,
};

use crate::transport::TransportEvent;

use super::{
    components::{
        AvatarBase, AvatarTransform, PlayerIdentity, DEFAULT_EYES_COLOR, DEFAULT_HAIR_COLOR,
        DEFAULT_SKIN_COLOR,
    },
    events::CommsEvent,
    profile::{AvatarProfile, ProfileError, ProfileFetcher},
};

/// Fetched profiles by normalized address, keyed forward by version.
pub type ProfileCache = HashMap<String, (AvatarProfile, u64)>;

/// The component stores synchronized for player entities. One set per
/// transport scope; subscriptions share it behind a lock.
struct SyncStores {
    identity: LwwComponentStore<PlayerIdentity>,
    avatar_base: LwwComponentStore<AvatarBase>,
    transform: LwwComponentStore<AvatarTransform>,
}

impl SyncStores {
    fn new() -> Self {
        Self {
            identity: LwwComponentStore::new(),
            avatar_base: LwwComponentStore::new(),
            transform: LwwComponentStore::new(),
        }
    }

    fn delete_everywhere(&mut self, entity: EntityId) {
        self.identity.delete(entity, true);
        self.avatar_base.delete(entity, true);
        self.transform.delete(entity, true);
    }
}

/// A profile fetch in flight, tagged with the exact entity (slot + version)
/// it was issued against. If the peer leaves, or its slot is recycled to a
/// different address before the fetch lands, the tag no longer matches the
/// allocator and the result is discarded.
struct PendingProfileFetch {
    address: String,
    entity: EntityId,
    announced_version: u64,
    reply: oneshot::Receiver<Result<AvatarProfile, ProfileError>>,
}

/// Maps peer lifecycle and payload events from one transport onto the
/// allocator and the LWW component stores, and fetches out-of-band profile
/// data as peers announce new versions.
///
/// All handlers run on the owning tick; the only interleaving is the profile
/// fetch, whose completion is re-validated against the allocator before any
/// component write (see [`update`](Self::update)).
pub struct AvatarSyncSystem {
    allocator: Arc<RwLock<PlayerEntityAllocator>>,
    profile_cache: Arc<RwLock<ProfileCache>>,
    fetcher: Arc<dyn ProfileFetcher>,
    stores: Arc<RwLock<SyncStores>>,
    pending_fetches: Vec<PendingProfileFetch>,
    /// Normalized addresses this system allocated. The allocator and profile
    /// cache are shared across transports; on dispose only these entries are
    /// released.
    owned: HashSet<String>,
    scratch: ByteWriter,
}

impl AvatarSyncSystem {
    /// `allocator` and `profile_cache` are session-scoped services owned by
    /// the orchestrator and handed in by reference; this system never creates
    /// its own.
    pub fn new(
        allocator: Arc<RwLock<PlayerEntityAllocator>>,
        profile_cache: Arc<RwLock<ProfileCache>>,
        fetcher: Arc<dyn ProfileFetcher>,
    ) -> Self {
        Self {
            allocator,
            profile_cache,
            fetcher,
            stores: Arc::new(RwLock::new(SyncStores::new())),
            pending_fetches: Vec::new(),
            owned: HashSet::new(),
            scratch: ByteWriter::new(),
        }
    }

    /// Finds the entity for `address`, lazily allocating (and seeding minimal
    /// guest identity) when `create_if_missing`. Allocation failure is a
    /// capacity condition: logged, no component store is touched.
    fn entity_for_address(&mut self, address: &str, create_if_missing: bool) -> Option<EntityId> {
        let mut allocator = self.allocator.write().unwrap();
        if let Some(entity) = allocator.entity_for_address(address) {
            return Some(entity);
        }
        if !create_if_missing {
            return None;
        }
        match allocator.allocate(address, false) {
            Ok(entity) => {
                drop(allocator);
                self.owned.insert(address.to_lowercase());
                self.stores.write().unwrap().identity.create_or_replace(
                    entity,
                    PlayerIdentity {
                        address: address.to_lowercase(),
                        is_guest: true,
                    },
                );
                Some(entity)
            }
            Err(e) => {
                warn!("failed to allocate entity for peer {address}: {e}");
                None
            }
        }
    }

    pub fn handle_transport_event(&mut self, event: &TransportEvent) {
        match event {
            TransportEvent::PeerConnected { address } => self.on_peer_connected(address),
            TransportEvent::PeerDisconnected { address } => self.on_peer_disconnected(address),
            TransportEvent::Message { address, payload } => self.on_message(address, payload),
            // Transport teardown is the orchestrator's concern.
            TransportEvent::Disconnected { .. } => {}
        }
    }

    fn on_peer_connected(&mut self, address: &str) {
        if self.entity_for_address(address, true).is_some() {
            // A fresh peer always has at least version 1 somewhere; announce
            // it to ourselves to kick off the initial fetch.
            self.on_profile_version(address, 1);
        }
    }

    fn on_peer_disconnected(&mut self, address: &str) {
        let Some(entity) = self.entity_for_address(address, false) else {
            return;
        };
        info!("peer {address} left, releasing {entity}");
        self.stores.write().unwrap().delete_everywhere(entity);
        self.owned.remove(&address.to_lowercase());
        self.allocator.write().unwrap().free(address);
        self.profile_cache
            .write()
            .unwrap()
            .remove(&address.to_lowercase());
    }

    fn on_message(&mut self, address: &str, payload: &[u8]) {
        match CommsEvent::decode(payload) {
            Ok(event) => self.handle_comms_event(address, &event),
            Err(e) => debug!("dropping undecodable payload from {address}: {e}"),
        }
    }

    pub fn handle_comms_event(&mut self, address: &str, event: &CommsEvent) {
        match event {
            CommsEvent::Position { position, rotation } => {
                if let Some(entity) = self.entity_for_address(address, true) {
                    self.stores
                        .write()
                        .unwrap()
                        .transform
                        .create_or_replace(entity, AvatarTransform::anchored(*position, *rotation));
                }
            }
            CommsEvent::ProfileVersion { version } => {
                self.on_profile_version(address, *version);
            }
            CommsEvent::Chat { message, .. } => {
                if self.entity_for_address(address, true).is_some() {
                    let cache = self.profile_cache.read().unwrap();
                    let name = cache
                        .get(&address.to_lowercase())
                        .map(|(profile, _)| profile.name.as_str())
                        .filter(|name| !name.is_empty())
                        .unwrap_or("Unknown");
                    info!("[chat] {name}: {message}");
                }
            }
        }
    }

    fn on_profile_version(&mut self, address: &str, announced_version: u64) {
        let Some(entity) = self.entity_for_address(address, true) else {
            return;
        };
        let normalized = address.to_lowercase();
        let cached_version = self
            .profile_cache
            .read()
            .unwrap()
            .get(&normalized)
            .map(|(_, version)| *version);
        if let Some(cached) = cached_version {
            if cached >= announced_version {
                // Cache already satisfies the announcement; skip the I/O.
                return;
            }
        }
        // Concurrent announcements for the same address are not deduplicated
        // against in-flight fetches; a redundant fetch resolves harmlessly
        // through the version checks below.
        let (tx, rx) = oneshot::channel();
        self.fetcher.spawn_fetch(&normalized, tx);
        self.pending_fetches.push(PendingProfileFetch {
            address: normalized,
            entity,
            announced_version,
            reply: rx,
        });
    }

    /// Per-tick housekeeping: applies completed profile fetches and flushes
    /// the per-component write markers. No network I/O happens here beyond
    /// collecting results that tasks already produced.
    pub fn update(&mut self) {
        let mut completed = Vec::new();
        self.pending_fetches.retain_mut(|pending| {
            match pending.reply.try_recv() {
                Ok(result) => {
                    completed.push((
                        pending.address.clone(),
                        pending.entity,
                        pending.announced_version,
                        result,
                    ));
                    false
                }
                Err(oneshot::error::TryRecvError::Empty) => true,
                Err(oneshot::error::TryRecvError::Closed) => {
                    debug!("profile fetch for {} was dropped", pending.address);
                    false
                }
            }
        });
        for (address, entity, announced_version, result) in completed {
            match result {
                Ok(profile) => {
                    self.apply_fetched_profile(&address, entity, announced_version, profile)
                }
                Err(e) => warn!("profile fetch for {address} failed: {e}"),
            }
        }

        let mut stores = self.stores.write().unwrap();
        self.scratch.clear();
        stores.identity.dump_updates(&mut self.scratch);
        stores.avatar_base.dump_updates(&mut self.scratch);
        stores.transform.dump_updates(&mut self.scratch);
    }

    fn apply_fetched_profile(
        &mut self,
        address: &str,
        issued_entity: EntityId,
        announced_version: u64,
        profile: AvatarProfile,
    ) {
        if profile.version < announced_version {
            debug!(
                "profile for {address} came back at v{} < announced v{announced_version}, dropping",
                profile.version
            );
            return;
        }
        {
            let cache = self.profile_cache.read().unwrap();
            if let Some((_, cached_version)) = cache.get(address) {
                if *cached_version >= profile.version {
                    // Only upgrades are applied; a racing older fetch loses.
                    return;
                }
            }
        }
        // The fetch suspended; the peer may have left (or its slot been
        // recycled) in the meantime. Apply only if the address still maps to
        // the exact entity the fetch was issued against.
        let current = self.allocator.read().unwrap().entity_for_address(address);
        if current != Some(issued_entity) {
            debug!("stale profile fetch for {address} (entity moved), dropping");
            return;
        }

        self.profile_cache
            .write()
            .unwrap()
            .insert(address.to_string(), (profile.clone(), profile.version));

        let mut stores = self.stores.write().unwrap();
        stores.identity.create_or_replace(
            issued_entity,
            PlayerIdentity {
                address: address.to_string(),
                is_guest: !profile.has_connected_web3,
            },
        );
        stores.avatar_base.create_or_replace(
            issued_entity,
            AvatarBase {
                name: if profile.name.is_empty() {
                    "Unknown".to_string()
                } else {
                    profile.name
                },
                body_shape_urn: profile.body_shape_urn,
                skin_color: profile.skin_color.unwrap_or(DEFAULT_SKIN_COLOR),
                eyes_color: profile.eyes_color.unwrap_or(DEFAULT_EYES_COLOR),
                hair_color: profile.hair_color.unwrap_or(DEFAULT_HAIR_COLOR),
            },
        );
    }

    /// Opens a replication handle over this system's stores. Each
    /// subscription owns independent watermarks, so multiple consumers can
    /// pull at different rates without interfering; create one per active
    /// transport.
    pub fn create_subscription(&self) -> ReplicationSubscription {
        ReplicationSubscription {
            stores: self.stores.clone(),
            identity_mark: 0,
            avatar_base_mark: 0,
            transform_mark: 0,
        }
    }

    /// Releases every peer this system allocated. The shared allocator and
    /// profile cache keep entries owned by sibling systems untouched.
    pub fn dispose(&mut self) {
        self.pending_fetches.clear();
        let mut allocator = self.allocator.write().unwrap();
        let mut cache = self.profile_cache.write().unwrap();
        for address in self.owned.drain() {
            allocator.free(&address);
            cache.remove(&address);
        }
    }

    // Read accessors for the scene-runtime bridge and tests.

    pub fn identity_of(&self, entity: EntityId) -> Option<PlayerIdentity> {
        self.stores.read().unwrap().identity.get(entity).cloned()
    }

    pub fn avatar_base_of(&self, entity: EntityId) -> Option<AvatarBase> {
        self.stores.read().unwrap().avatar_base.get(entity).cloned()
    }

    pub fn transform_of(&self, entity: EntityId) -> Option<AvatarTransform> {
        self.stores.read().unwrap().transform.get(entity).cloned()
    }

    pub fn pending_fetch_count(&self) -> usize {
        self.pending_fetches.len()
    }

    /// Serializes every live entry of every synchronized store, for a
    /// late-joining subscriber that needs a full resync.
    pub fn dump_full_state(&self, writer: &mut ByteWriter) {
        let stores = self.stores.read().unwrap();
        stores.identity.dump_full_state(writer);
        stores.avatar_base.dump_full_state(writer);
        stores.transform.dump_full_state(writer);
    }
}

/// A delta-pull handle over one [`AvatarSyncSystem`]'s stores, claiming the
/// remote-player entity range.
pub struct ReplicationSubscription {
    stores: Arc<RwLock<SyncStores>>,
    identity_mark: u64,
    avatar_base_mark: u64,
    transform_mark: u64,
}

impl ReplicationSubscription {
    /// The entity slot range this subscription claims ownership of.
    pub fn range(&self) -> (u16, u16) {
        (REMOTE_PLAYER_SLOT_FROM, REMOTE_PLAYER_SLOT_TO)
    }

    /// Serializes every entry changed since this subscription's last pull,
    /// advancing only this subscription's watermarks.
    pub fn get_updates(&mut self, writer: &mut ByteWriter) {
        let stores = self.stores.read().unwrap();
        self.identity_mark = stores.identity.dump_deltas(writer, self.identity_mark);
        self.avatar_base_mark = stores.avatar_base.dump_deltas(writer, self.avatar_base_mark);
        self.transform_mark = stores.transform.dump_deltas(writer, self.transform_mark);
    }

    /// Consumes the handle; its watermarks are discarded. The peers behind
    /// the stores stay owned by the sync system that allocated them.
    pub fn dispose(self) {}
}
