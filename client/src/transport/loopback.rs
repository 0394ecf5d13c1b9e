use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use super::{
    CloseReason, RoomSocket, RoomSocketConnector, SocketEvent, TransportError, TransportProtocol,
};

type Inbox = Arc<Mutex<VecDeque<SocketEvent>>>;

/// An in-process room hub: every member sees the others join, leave, and
/// broadcast, through the same [`RoomSocket`] contract a wire backend would
/// implement. Doubles as the offline transport stand-in and as the backend
/// for integration tests.
#[derive(Clone)]
pub struct LoopbackRoom {
    members: Arc<Mutex<HashMap<String, Inbox>>>,
}

impl LoopbackRoom {
    pub fn new() -> Self {
        Self {
            members: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Creates a socket for `address`. The peer becomes visible to the room
    /// only once the socket's `connect` runs.
    pub fn join(&self, address: &str) -> LoopbackSocket {
        LoopbackSocket {
            room: self.clone(),
            address: address.to_string(),
            inbox: Arc::new(Mutex::new(VecDeque::new())),
            joined: false,
        }
    }

    /// Forcibly removes a member, delivering `reason` to it. Lets tests drive
    /// involuntary closure (kick / duplicate identity).
    pub fn kick(&self, address: &str, reason: CloseReason) {
        let mut members = self.members.lock().unwrap();
        if let Some(inbox) = members.remove(address) {
            inbox
                .lock()
                .unwrap()
                .push_back(SocketEvent::Closed { reason });
            for other in members.values() {
                other.lock().unwrap().push_back(SocketEvent::PeerLeft {
                    address: address.to_string(),
                });
            }
        }
    }

    pub fn member_count(&self) -> usize {
        self.members.lock().unwrap().len()
    }

    fn register(&self, address: &str, inbox: Inbox) {
        let mut members = self.members.lock().unwrap();
        for (other_address, other_inbox) in members.iter() {
            other_inbox
                .lock()
                .unwrap()
                .push_back(SocketEvent::PeerJoined {
                    address: address.to_string(),
                });
            inbox.lock().unwrap().push_back(SocketEvent::PeerJoined {
                address: other_address.clone(),
            });
        }
        members.insert(address.to_string(), inbox);
    }

    fn unregister(&self, address: &str) {
        let mut members = self.members.lock().unwrap();
        if members.remove(address).is_some() {
            for other in members.values() {
                other.lock().unwrap().push_back(SocketEvent::PeerLeft {
                    address: address.to_string(),
                });
            }
        }
    }

    fn broadcast(&self, from: &str, payload: &[u8], destinations: Option<&[String]>) {
        let members = self.members.lock().unwrap();
        for (address, inbox) in members.iter() {
            if address == from {
                continue;
            }
            if let Some(targets) = destinations {
                if !targets.iter().any(|t| t == address) {
                    continue;
                }
            }
            inbox.lock().unwrap().push_back(SocketEvent::Data {
                from: from.to_string(),
                payload: payload.to_vec(),
            });
        }
    }
}

impl Default for LoopbackRoom {
    fn default() -> Self {
        Self::new()
    }
}

/// One member's endpoint into a [`LoopbackRoom`].
pub struct LoopbackSocket {
    room: LoopbackRoom,
    address: String,
    inbox: Inbox,
    joined: bool,
}

impl RoomSocket for LoopbackSocket {
    fn connect(&mut self) -> Result<(), TransportError> {
        if !self.joined {
            self.room.register(&self.address, self.inbox.clone());
            self.joined = true;
        }
        Ok(())
    }

    fn send(
        &mut self,
        payload: &[u8],
        _reliable: bool,
        destinations: Option<&[String]>,
    ) -> Result<(), TransportError> {
        if !self.joined {
            return Err(TransportError::SendFailed {
                reason: "socket not connected".to_string(),
            });
        }
        self.room.broadcast(&self.address, payload, destinations);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        if self.joined {
            self.joined = false;
            self.room.unregister(&self.address);
            self.inbox.lock().unwrap().push_back(SocketEvent::Closed {
                reason: CloseReason::LocalRequest,
            });
        }
        Ok(())
    }

    fn poll_event(&mut self) -> Option<SocketEvent> {
        self.inbox.lock().unwrap().pop_front()
    }
}

/// A [`RoomSocketConnector`] that routes every descriptor URL to an
/// in-process room. Tests grab the hub via [`room`](Self::room) to play the
/// part of remote peers.
pub struct LoopbackConnector {
    local_address: String,
    rooms: Mutex<HashMap<String, LoopbackRoom>>,
}

impl LoopbackConnector {
    pub fn new(local_address: &str) -> Self {
        Self {
            local_address: local_address.to_string(),
            rooms: Mutex::new(HashMap::new()),
        }
    }

    /// The room hub behind `url`, creating it if no socket has opened it yet.
    pub fn room(&self, url: &str) -> LoopbackRoom {
        self.rooms
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .clone()
    }
}

impl RoomSocketConnector for LoopbackConnector {
    fn open(
        &self,
        _protocol: TransportProtocol,
        url: &str,
        _access_token: Option<&str>,
    ) -> Result<Box<dyn RoomSocket>, TransportError> {
        Ok(Box::new(self.room(url).join(&self.local_address)))
    }
}
