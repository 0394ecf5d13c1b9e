use thiserror::Error;

/// Errors that can occur while allocating player entity identifiers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocError {
    /// Every slot in the remote-player pool is live (or its version counter
    /// is exhausted). Recoverable: the caller may reject the new peer.
    #[error("Remote player entity pool exhausted: all {capacity} slots in use")]
    PoolExhausted { capacity: usize },
}
