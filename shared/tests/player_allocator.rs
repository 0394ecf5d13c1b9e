/// Tests for PlayerEntityAllocator: idempotent allocation, version-based
/// slot reuse, the fixed local-player sentinel, and pool exhaustion.
use commune_shared::{
    AllocError, EntityId, PlayerEntityAllocator, LOCAL_PLAYER, REMOTE_PLAYER_POOL_CAPACITY,
    REMOTE_PLAYER_SLOT_FROM,
};

#[test]
fn allocate_is_idempotent_per_address() {
    let mut allocator = PlayerEntityAllocator::new();

    let first = allocator.allocate("0xAAA", false).unwrap();
    let second = allocator.allocate("0xAAA", false).unwrap();

    assert_eq!(first, second);
    assert_eq!(allocator.live_count(), 1);
}

#[test]
fn addresses_are_case_insensitive() {
    let mut allocator = PlayerEntityAllocator::new();

    let lower = allocator.allocate("0xabcdef", false).unwrap();
    let upper = allocator.allocate("0xABCDEF", false).unwrap();

    assert_eq!(lower, upper);
    assert_eq!(allocator.address_for_entity(lower), Some("0xabcdef"));
}

#[test]
fn local_player_id_is_invariant() {
    let mut allocator = PlayerEntityAllocator::new();

    let id = allocator.allocate("0xLocal", true).unwrap();
    assert_eq!(id, LOCAL_PLAYER);

    allocator.free("0xLocal");
    assert_eq!(allocator.entity_for_address("0xLocal"), None);

    // Reallocating after a free still yields the sentinel.
    let id = allocator.allocate("0xLocal", true).unwrap();
    assert_eq!(id, LOCAL_PLAYER);
    assert!(allocator.is_player_entity(LOCAL_PLAYER));
}

#[test]
fn slot_reuse_bumps_version_and_invalidates_old_handle() {
    let mut allocator = PlayerEntityAllocator::new();

    let e1 = allocator.allocate("0xAAA", false).unwrap();
    assert_eq!(e1, EntityId::new(REMOTE_PLAYER_SLOT_FROM, 0));

    allocator.free("0xAAA");
    assert_eq!(allocator.entity_for_address("0xAAA"), None);

    let e2 = allocator.allocate("0xBBB", false).unwrap();
    assert_eq!(e2.slot(), e1.slot());
    assert!(e2.version() > e1.version());

    // The stale handle must not resolve to the new occupant.
    assert_eq!(allocator.address_for_entity(e1), None);
    assert!(!allocator.is_player_entity(e1));
    assert_eq!(allocator.address_for_entity(e2), Some("0xbbb"));
}

#[test]
fn occupied_slots_are_never_reused() {
    let mut allocator = PlayerEntityAllocator::new();

    let e1 = allocator.allocate("0xAAA", false).unwrap();
    let e2 = allocator.allocate("0xBBB", false).unwrap();

    // Second peer gets a fresh slot, not a bumped version of a live one.
    assert_ne!(e1.slot(), e2.slot());
    assert_eq!(e2, EntityId::new(REMOTE_PLAYER_SLOT_FROM + 1, 0));
}

#[test]
fn free_of_unknown_address_is_a_noop() {
    let mut allocator = PlayerEntityAllocator::new();
    allocator.free("0xNobody");
    assert_eq!(allocator.live_count(), 0);
}

#[test]
fn pool_exhaustion_is_a_capacity_error() {
    let mut allocator = PlayerEntityAllocator::new();

    for i in 0..REMOTE_PLAYER_POOL_CAPACITY {
        allocator
            .allocate(&format!("0xPeer{i}"), false)
            .unwrap_or_else(|e| panic!("peer {i} should fit: {e}"));
    }

    let result = allocator.allocate("0xOneTooMany", false);
    assert_eq!(
        result,
        Err(AllocError::PoolExhausted {
            capacity: REMOTE_PLAYER_POOL_CAPACITY
        })
    );

    // Freeing one peer makes room again, with a bumped version.
    allocator.free("0xPeer0");
    let reused = allocator.allocate("0xOneTooMany", false).unwrap();
    assert_eq!(reused.slot(), REMOTE_PLAYER_SLOT_FROM);
    assert_eq!(reused.version(), 1);
}

#[test]
fn clear_resets_to_initial_state() {
    let mut allocator = PlayerEntityAllocator::new();

    allocator.allocate("0xAAA", false).unwrap();
    allocator.allocate("0xBBB", false).unwrap();
    allocator.free("0xAAA");
    allocator.clear();

    assert_eq!(allocator.live_count(), 0);
    // Post-clear allocation starts from the first slot at version 0 again.
    let e = allocator.allocate("0xCCC", false).unwrap();
    assert_eq!(e, EntityId::new(REMOTE_PLAYER_SLOT_FROM, 0));
}
