mod avatar_system;
mod components;
mod events;
mod profile;

pub use avatar_system::{AvatarSyncSystem, ProfileCache, ReplicationSubscription};
pub use components::{
    AvatarBase, AvatarTransform, PlayerIdentity, DEFAULT_EYES_COLOR, DEFAULT_HAIR_COLOR,
    DEFAULT_SKIN_COLOR, GLOBAL_COORDINATE_ROOT,
};
pub use events::CommsEvent;
pub use profile::{AvatarProfile, HttpProfileFetcher, ProfileError, ProfileFetcher};
