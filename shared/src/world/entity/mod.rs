mod allocator;
mod entity_id;
mod error;

pub use allocator::PlayerEntityAllocator;
pub use entity_id::{
    EntityId, LOCAL_PLAYER, REMOTE_PLAYER_POOL_CAPACITY, REMOTE_PLAYER_SLOT_FROM,
    REMOTE_PLAYER_SLOT_TO,
};
pub use error::AllocError;
