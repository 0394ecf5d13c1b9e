use std::{
    collections::HashMap,
    sync::{Arc, Mutex, RwLock},
};

use tokio::sync::oneshot;

use commune_client::comms::{
    AvatarProfile, AvatarSyncSystem, CommsEvent, ProfileCache, ProfileError, ProfileFetcher,
    DEFAULT_HAIR_COLOR, GLOBAL_COORDINATE_ROOT,
};
use commune_client::transport::TransportEvent;
use commune_client::{
    ByteWriter, Color3, EntityId, PlayerEntityAllocator, Quaternion, Vector3,
    REMOTE_PLAYER_POOL_CAPACITY, REMOTE_PLAYER_SLOT_FROM,
};

type Reply = oneshot::Sender<Result<AvatarProfile, ProfileError>>;

/// Answers fetches immediately from an in-memory table; unknown addresses
/// resolve to `NotFound`.
struct ScriptedFetcher {
    profiles: Mutex<HashMap<String, AvatarProfile>>,
}

impl ScriptedFetcher {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            profiles: Mutex::new(HashMap::new()),
        })
    }

    fn publish(&self, address: &str, profile: AvatarProfile) {
        self.profiles
            .lock()
            .unwrap()
            .insert(address.to_lowercase(), profile);
    }
}

impl ProfileFetcher for ScriptedFetcher {
    fn spawn_fetch(&self, address: &str, reply: Reply) {
        let result = self
            .profiles
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .ok_or_else(|| ProfileError::NotFound {
                address: address.to_string(),
            });
        let _ = reply.send(result);
    }
}

/// Holds every fetch open until the test resolves it, in issue order.
struct HeldFetcher {
    pending: Mutex<Vec<(String, Reply)>>,
}

impl HeldFetcher {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            pending: Mutex::new(Vec::new()),
        })
    }

    fn resolve_oldest(&self, profile: AvatarProfile) {
        let (_, reply) = self.pending.lock().unwrap().remove(0);
        let _ = reply.send(Ok(profile));
    }

    fn resolve_newest(&self, profile: AvatarProfile) {
        let (_, reply) = self.pending.lock().unwrap().pop().unwrap();
        let _ = reply.send(Ok(profile));
    }
}

impl ProfileFetcher for HeldFetcher {
    fn spawn_fetch(&self, address: &str, reply: Reply) {
        self.pending
            .lock()
            .unwrap()
            .push((address.to_string(), reply));
    }
}

fn profile(version: u64, name: &str) -> AvatarProfile {
    AvatarProfile {
        version,
        name: name.to_string(),
        has_connected_web3: true,
        body_shape_urn: "urn:shape:base".to_string(),
        skin_color: Some(Color3::new(0.5, 0.4, 0.3)),
        eyes_color: Some(Color3::new(0.1, 0.2, 0.9)),
        hair_color: None,
    }
}

fn new_system(
    fetcher: Arc<dyn ProfileFetcher>,
) -> (
    AvatarSyncSystem,
    Arc<RwLock<PlayerEntityAllocator>>,
    Arc<RwLock<ProfileCache>>,
) {
    let allocator = Arc::new(RwLock::new(PlayerEntityAllocator::new()));
    let cache = Arc::new(RwLock::new(ProfileCache::new()));
    let system = AvatarSyncSystem::new(allocator.clone(), cache.clone(), fetcher);
    (system, allocator, cache)
}

fn position_payload(x: f32) -> Vec<u8> {
    CommsEvent::Position {
        position: Vector3::new(x, 0.0, 0.0),
        rotation: Quaternion::IDENTITY,
    }
    .encode()
}

#[test]
fn peer_lifecycle_allocates_syncs_and_releases() {
    let fetcher = ScriptedFetcher::new();
    fetcher.publish("0xAda", profile(1, "ada"));
    let (mut system, allocator, cache) = new_system(fetcher);

    system.handle_transport_event(&TransportEvent::PeerConnected {
        address: "0xAda".to_string(),
    });
    let entity = allocator
        .read()
        .unwrap()
        .entity_for_address("0xada")
        .expect("peer should be allocated");
    assert_eq!(entity, EntityId::new(REMOTE_PLAYER_SLOT_FROM, 0));

    system.update();
    let identity = system.identity_of(entity).expect("identity synced");
    assert_eq!(identity.address, "0xada");
    assert!(!identity.is_guest);
    let base = system.avatar_base_of(entity).expect("appearance synced");
    assert_eq!(base.name, "ada");
    assert_eq!(base.skin_color, Color3::new(0.5, 0.4, 0.3));
    assert_eq!(base.hair_color, DEFAULT_HAIR_COLOR);

    system.handle_transport_event(&TransportEvent::Message {
        address: "0xAda".to_string(),
        payload: position_payload(7.0),
    });
    let transform = system.transform_of(entity).expect("pose synced");
    assert_eq!(transform.position, Vector3::new(7.0, 0.0, 0.0));
    assert_eq!(transform.parent, GLOBAL_COORDINATE_ROOT);

    system.handle_transport_event(&TransportEvent::PeerDisconnected {
        address: "0xAda".to_string(),
    });
    assert!(allocator
        .read()
        .unwrap()
        .entity_for_address("0xada")
        .is_none());
    assert!(cache.read().unwrap().is_empty());
    assert!(system.identity_of(entity).is_none());
    assert!(system.transform_of(entity).is_none());
}

#[test]
fn pool_exhaustion_leaves_stores_untouched() {
    let (mut system, allocator, _cache) = new_system(ScriptedFetcher::new());

    for i in 0..REMOTE_PLAYER_POOL_CAPACITY {
        system.handle_transport_event(&TransportEvent::PeerConnected {
            address: format!("0x{i:04x}"),
        });
    }
    assert_eq!(
        allocator.read().unwrap().live_count(),
        REMOTE_PLAYER_POOL_CAPACITY
    );

    // One over capacity: the peer gets no entity, and its payloads change
    // nothing.
    system.handle_transport_event(&TransportEvent::PeerConnected {
        address: "0xffff".to_string(),
    });
    assert!(allocator
        .read()
        .unwrap()
        .entity_for_address("0xffff")
        .is_none());
    system.handle_transport_event(&TransportEvent::Message {
        address: "0xffff".to_string(),
        payload: position_payload(1.0),
    });
    assert!(allocator
        .read()
        .unwrap()
        .entity_for_address("0xffff")
        .is_none());
    assert_eq!(
        allocator.read().unwrap().live_count(),
        REMOTE_PLAYER_POOL_CAPACITY
    );
}

#[test]
fn position_before_announcement_lazily_allocates() {
    let (mut system, allocator, _cache) = new_system(ScriptedFetcher::new());

    // The pose can arrive before the roster announces the peer; it must not
    // be dropped.
    system.handle_transport_event(&TransportEvent::Message {
        address: "0xEarly".to_string(),
        payload: position_payload(3.0),
    });

    let entity = allocator
        .read()
        .unwrap()
        .entity_for_address("0xearly")
        .expect("payload should lazily allocate");
    let identity = system.identity_of(entity).expect("minimal identity seeded");
    assert_eq!(identity.address, "0xearly");
    assert!(identity.is_guest);
    assert!(system.transform_of(entity).is_some());
    // No version was announced, so no fetch was issued.
    assert_eq!(system.pending_fetch_count(), 0);
}

#[test]
fn fetch_landing_after_departure_is_discarded() {
    let fetcher = HeldFetcher::new();
    let (mut system, allocator, cache) = new_system(fetcher.clone());

    system.handle_transport_event(&TransportEvent::PeerConnected {
        address: "0xeve".to_string(),
    });
    assert_eq!(system.pending_fetch_count(), 1);

    system.handle_transport_event(&TransportEvent::PeerDisconnected {
        address: "0xeve".to_string(),
    });
    fetcher.resolve_oldest(profile(1, "eve"));
    system.update();

    assert!(cache.read().unwrap().is_empty());
    assert!(allocator
        .read()
        .unwrap()
        .entity_for_address("0xeve")
        .is_none());
}

#[test]
fn recycled_slot_rejects_fetch_from_previous_tenure() {
    let fetcher = HeldFetcher::new();
    let (mut system, allocator, cache) = new_system(fetcher.clone());

    system.handle_transport_event(&TransportEvent::PeerConnected {
        address: "0xeve".to_string(),
    });
    system.handle_transport_event(&TransportEvent::PeerDisconnected {
        address: "0xeve".to_string(),
    });
    system.handle_transport_event(&TransportEvent::PeerConnected {
        address: "0xeve".to_string(),
    });

    // The reconnect reuses slot 32 with a bumped version, so the first
    // tenure's fetch no longer matches the live entity.
    let entity = allocator
        .read()
        .unwrap()
        .entity_for_address("0xeve")
        .unwrap();
    assert_eq!(entity, EntityId::new(REMOTE_PLAYER_SLOT_FROM, 1));
    assert_eq!(system.pending_fetch_count(), 2);

    fetcher.resolve_oldest(profile(5, "stale"));
    system.update();
    assert!(cache.read().unwrap().is_empty());
    assert!(system.avatar_base_of(entity).is_none());

    fetcher.resolve_oldest(profile(1, "fresh"));
    system.update();
    assert_eq!(system.avatar_base_of(entity).unwrap().name, "fresh");
    assert_eq!(cache.read().unwrap().get("0xeve").unwrap().1, 1);
}

#[test]
fn stale_fetch_never_regresses_the_cache() {
    let fetcher = HeldFetcher::new();
    let (mut system, allocator, cache) = new_system(fetcher.clone());

    // The connect announcement and a later one race; two fetches in flight.
    system.handle_transport_event(&TransportEvent::PeerConnected {
        address: "0xada".to_string(),
    });
    system.handle_comms_event("0xada", &CommsEvent::ProfileVersion { version: 3 });
    assert_eq!(system.pending_fetch_count(), 2);

    fetcher.resolve_newest(profile(3, "current"));
    system.update();
    assert_eq!(cache.read().unwrap().get("0xada").unwrap().1, 3);

    // The older fetch lands after the cache advanced; it must not win.
    fetcher.resolve_oldest(profile(2, "stale"));
    system.update();
    assert_eq!(cache.read().unwrap().get("0xada").unwrap().1, 3);
    let entity = allocator
        .read()
        .unwrap()
        .entity_for_address("0xada")
        .unwrap();
    assert_eq!(system.avatar_base_of(entity).unwrap().name, "current");
}

#[test]
fn cached_version_short_circuits_refetch() {
    let fetcher = ScriptedFetcher::new();
    fetcher.publish("0xada", profile(3, "ada"));
    let (mut system, _allocator, cache) = new_system(fetcher);

    system.handle_transport_event(&TransportEvent::PeerConnected {
        address: "0xada".to_string(),
    });
    system.update();
    assert_eq!(cache.read().unwrap().get("0xada").unwrap().1, 3);

    // An announcement at or below the cached version costs no fetch.
    system.handle_comms_event("0xada", &CommsEvent::ProfileVersion { version: 2 });
    assert_eq!(system.pending_fetch_count(), 0);
    system.handle_comms_event("0xada", &CommsEvent::ProfileVersion { version: 3 });
    assert_eq!(system.pending_fetch_count(), 0);

    // A newer announcement does.
    system.handle_comms_event("0xada", &CommsEvent::ProfileVersion { version: 5 });
    assert_eq!(system.pending_fetch_count(), 1);
}

#[test]
fn subscription_pulls_deltas_independently() {
    let (mut system, _allocator, _cache) = new_system(ScriptedFetcher::new());
    let mut subscription = system.create_subscription();
    assert_eq!(subscription.range(), (32, 256));

    system.handle_transport_event(&TransportEvent::Message {
        address: "0xada".to_string(),
        payload: position_payload(1.0),
    });

    let mut writer = ByteWriter::new();
    subscription.get_updates(&mut writer);
    assert!(!writer.as_slice().is_empty());

    // Nothing changed since the last pull.
    writer.clear();
    subscription.get_updates(&mut writer);
    assert!(writer.as_slice().is_empty());
}
