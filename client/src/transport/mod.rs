mod error;
mod loopback;
mod room;

pub use error::TransportError;
pub use loopback::{LoopbackConnector, LoopbackRoom, LoopbackSocket};
pub use room::{RoomTransport, TransportProtocol, MAX_MESSAGE_SIZE};

/// A normalized event surfaced by every transport variant.
///
/// This is the closed event contract consumed by the avatar sync system and
/// the orchestrator; there is no dynamic listener fan-out, one handler drains
/// events per transport per tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    PeerConnected { address: String },
    PeerDisconnected { address: String },
    Message { address: String, payload: Vec<u8> },
    /// The transport itself went down. `kicked` distinguishes involuntary
    /// closure (duplicate identity / server kick) from everything else so the
    /// caller can decide whether a user-facing warning is warranted.
    Disconnected { kicked: bool },
}

/// Hints for an outbound payload.
#[derive(Debug, Clone, Copy)]
pub struct SendOptions {
    pub reliable: bool,
}

/// Why a backend session closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// We asked for the close.
    LocalRequest,
    /// The server dropped us because the same identity joined elsewhere.
    DuplicateIdentity,
    /// The server removed us for any other reason.
    ServerKick,
    /// Connection failure.
    Error,
}

/// A raw event from a backend room session, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    PeerJoined { address: String },
    PeerLeft { address: String },
    Data { from: String, payload: Vec<u8> },
    Closed { reason: CloseReason },
}

/// The backend session contract.
///
/// Implementations own the actual wire protocol (out of scope here); they
/// must deliver events in wire order and may drop messages (at-most-once).
/// `poll_event` is non-blocking: the single-threaded tick drains it.
pub trait RoomSocket: Send {
    fn connect(&mut self) -> Result<(), TransportError>;

    fn send(
        &mut self,
        payload: &[u8],
        reliable: bool,
        destinations: Option<&[String]>,
    ) -> Result<(), TransportError>;

    fn disconnect(&mut self) -> Result<(), TransportError>;

    fn poll_event(&mut self) -> Option<SocketEvent>;
}

/// Produces backend sockets for a parsed transport descriptor. The seam
/// through which real protocol implementations (or test loopbacks) enter.
pub trait RoomSocketConnector: Send + Sync {
    fn open(
        &self,
        protocol: TransportProtocol,
        url: &str,
        access_token: Option<&str>,
    ) -> Result<Box<dyn RoomSocket>, TransportError>;
}
