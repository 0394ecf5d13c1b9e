use thiserror::Error;

/// Errors that can occur while constructing or driving a room transport
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The connection string's scheme prefix named no known protocol
    #[error("No transport available for protocol '{protocol}'")]
    UnknownProtocol { protocol: String },

    /// The connection string had no colon-delimited scheme prefix
    #[error("Malformed connection string '{connection_string}': missing protocol prefix")]
    MissingProtocol { connection_string: String },

    /// A reliable-room URL is required to carry an access token
    #[error("No access token in reliable room url '{url}'")]
    MissingAccessToken { url: String },

    /// The backend session failed to establish
    #[error("Connect failed: {reason}")]
    ConnectFailed { reason: String },

    /// The backend refused or failed a send
    #[error("Send failed: {reason}")]
    SendFailed { reason: String },

    /// Operation on a transport that was already disposed
    #[error("Transport already disposed")]
    Disposed,
}
