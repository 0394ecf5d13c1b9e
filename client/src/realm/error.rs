use thiserror::Error;

/// Errors that can occur while resolving, joining, or negotiating a realm
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RealmError {
    /// The realm identifier could not be turned into a base endpoint
    #[error("Cannot resolve realm '{input}': {reason}")]
    Resolution { input: String, reason: &'static str },

    /// The realm's metadata endpoint was absent or answered non-2xx.
    /// Hard connect failure for that realm; the previous realm stays current.
    #[error("Could not load realm metadata from {url} (status {status})")]
    MetadataUnavailable { url: String, status: u16 },

    /// A realm or handshake request never completed
    #[error("Realm request failed: {0}")]
    Request(String),

    /// The adapter connection string's scheme named no known protocol
    #[error("No communications adapter for protocol '{protocol}'")]
    UnknownAdapterProtocol { protocol: String },

    /// The signed handshake was refused or answered unusably
    #[error("Adapter handshake failed: {message}")]
    AdapterHandshake { message: String },
}
