use log::{error, info, warn};

use super::{
    CloseReason, RoomSocket, RoomSocketConnector, SendOptions, SocketEvent, TransportError,
    TransportEvent,
};

/// Outbound payloads above this are dropped locally instead of sent; larger
/// frames get fragmented or rejected by the room backends.
pub const MAX_MESSAGE_SIZE: usize = 30_000;

/// The closed set of backend protocols. Chosen once when the connection
/// string is parsed; never re-derived from the string afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportProtocol {
    /// Plain socket room (`ws-room:` descriptors).
    WsRoom,
    /// Reliable room multicast behind an access token (`livekit:` descriptors).
    Reliable,
}

/// One connected room session behind the normalized [`TransportEvent`]
/// interface, whatever the backend protocol.
pub struct RoomTransport {
    protocol: TransportProtocol,
    url: String,
    scene_id: String,
    socket: Box<dyn RoomSocket>,
    connected: bool,
    disposed: bool,
}

impl RoomTransport {
    /// Parses a colon-delimited connection string and opens (but does not
    /// connect) the matching backend through `connector`.
    ///
    /// `ws-room:` URLs with no `ws:`/`wss:` scheme are upgraded to `wss://`.
    /// Reliable-room URLs must carry an `access_token` query parameter.
    pub fn new(
        connection_string: &str,
        scene_id: &str,
        connector: &dyn RoomSocketConnector,
    ) -> Result<Self, TransportError> {
        let Some(split) = connection_string.find(':') else {
            return Err(TransportError::MissingProtocol {
                connection_string: connection_string.to_string(),
            });
        };
        let (scheme, rest) = connection_string.split_at(split);
        let rest = &rest[1..];

        let (protocol, url, token) = match scheme {
            "ws-room" => {
                let url = if rest.starts_with("ws:") || rest.starts_with("wss:") {
                    rest.to_string()
                } else {
                    format!("wss://{rest}")
                };
                (TransportProtocol::WsRoom, url, None)
            }
            "livekit" => {
                let (base, token) = split_access_token(rest);
                let Some(token) = token else {
                    return Err(TransportError::MissingAccessToken {
                        url: rest.to_string(),
                    });
                };
                (TransportProtocol::Reliable, base, Some(token))
            }
            other => {
                return Err(TransportError::UnknownProtocol {
                    protocol: other.to_string(),
                });
            }
        };

        let socket = connector.open(protocol, &url, token.as_deref())?;
        Ok(Self {
            protocol,
            url,
            scene_id: scene_id.to_string(),
            socket,
            connected: false,
            disposed: false,
        })
    }

    pub fn protocol(&self) -> TransportProtocol {
        self.protocol
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn scene_id(&self) -> &str {
        &self.scene_id
    }

    pub fn is_connected(&self) -> bool {
        self.connected && !self.disposed
    }

    pub fn connect(&mut self) -> Result<(), TransportError> {
        if self.disposed {
            return Err(TransportError::Disposed);
        }
        self.socket.connect()?;
        self.connected = true;
        info!("connected to room {}", self.url);
        Ok(())
    }

    /// Sends a payload to the room (or to `destinations` only).
    ///
    /// Payloads over [`MAX_MESSAGE_SIZE`] are dropped locally with a
    /// diagnostic; that is deliberately not an error to the caller.
    pub fn send(
        &mut self,
        payload: &[u8],
        options: SendOptions,
        destinations: Option<&[String]>,
    ) -> Result<(), TransportError> {
        if self.disposed {
            return Err(TransportError::Disposed);
        }
        if payload.len() > MAX_MESSAGE_SIZE {
            error!(
                "skipping oversized message ({} bytes > {MAX_MESSAGE_SIZE}) on {}",
                payload.len(),
                self.url
            );
            return Ok(());
        }
        self.socket.send(payload, options.reliable, destinations)
    }

    /// Asks the backend to close. The terminal `Disconnected` event still
    /// arrives through [`poll_event`](Self::poll_event) once the close
    /// completes; callers evict the transport then, not here.
    pub fn disconnect(&mut self) -> Result<(), TransportError> {
        if self.disposed {
            return Ok(());
        }
        self.socket.disconnect()
    }

    /// Drains the next normalized event, if any. Returns `None` once the
    /// socket is quiet or the transport has been disposed.
    pub fn poll_event(&mut self) -> Option<TransportEvent> {
        loop {
            if self.disposed {
                return None;
            }
            let event = self.socket.poll_event()?;
            match event {
                SocketEvent::PeerJoined { address } => {
                    return Some(TransportEvent::PeerConnected { address });
                }
                SocketEvent::PeerLeft { address } => {
                    return Some(TransportEvent::PeerDisconnected { address });
                }
                SocketEvent::Data { from, payload } => {
                    return Some(TransportEvent::Message {
                        address: from,
                        payload,
                    });
                }
                SocketEvent::Closed { reason } => {
                    // Emit the terminal event exactly once, then go quiet.
                    self.disposed = true;
                    self.connected = false;
                    let kicked = reason == CloseReason::DuplicateIdentity;
                    if reason != CloseReason::LocalRequest {
                        warn!("room {} closed: {:?}", self.url, reason);
                    }
                    return Some(TransportEvent::Disconnected { kicked });
                }
            }
        }
    }
}

/// Splits an `access_token` query parameter out of a URL, returning the URL
/// without its query string plus the token, if present.
fn split_access_token(url: &str) -> (String, Option<String>) {
    let Some(query_start) = url.find('?') else {
        return (url.to_string(), None);
    };
    let (base, query) = url.split_at(query_start);
    let token = query[1..].split('&').find_map(|pair| {
        pair.strip_prefix("access_token=")
            .map(|value| value.to_string())
    });
    (base.to_string(), token)
}
