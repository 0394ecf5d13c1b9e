use log::info;
use serde::Deserialize;
use serde_json::json;

use crate::identity::{ExplorerIdentity, HandshakeSigner};

use super::error::RealmError;

/// One desired backend connection, as produced by an adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportDescriptor {
    pub url: String,
    pub scene_id: String,
}

/// The closed set of adapter protocols, chosen once when the connection
/// string is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterProtocol {
    /// Reliable room multicast (livekit-style token URLs).
    Reliable,
    /// Plain socket room.
    WsRoom,
    /// A handshake endpoint that answers with the real adapter once signed.
    SignedLogin,
    /// No communications for this realm.
    Offline,
}

impl AdapterProtocol {
    fn parse(connection_string: &str) -> Result<(Self, &str), RealmError> {
        let Some(split) = connection_string.find(':') else {
            return Err(RealmError::UnknownAdapterProtocol {
                protocol: connection_string.to_string(),
            });
        };
        let (scheme, rest) = connection_string.split_at(split);
        let rest = &rest[1..];
        let protocol = match scheme {
            "livekit" => Self::Reliable,
            "ws-room" => Self::WsRoom,
            "signed-login" => Self::SignedLogin,
            "offline" => Self::Offline,
            other => {
                return Err(RealmError::UnknownAdapterProtocol {
                    protocol: other.to_string(),
                })
            }
        };
        Ok((protocol, rest))
    }
}

/// A negotiated communications adapter: the absolute list of transports a
/// participant should hold open right now.
pub struct CommsAdapter {
    protocol: AdapterProtocol,
    desired: Vec<TransportDescriptor>,
}

impl CommsAdapter {
    pub fn protocol(&self) -> AdapterProtocol {
        self.protocol
    }

    pub fn desired_transports(&self) -> &[TransportDescriptor] {
        &self.desired
    }

    /// Tears the adapter down. Fixed adapters hold no server-side session,
    /// so there is nothing to release beyond dropping the desired list.
    pub fn disconnect(&mut self) {
        self.desired.clear();
    }
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SignedLoginResponse {
    fixed_adapter: Option<String>,
    message: Option<String>,
}

/// Negotiates an adapter for a connection string.
///
/// Fixed protocols produce a static desired-transport list. `signed-login:`
/// POSTs an authenticated handshake and follows the returned fixed adapter
/// exactly once; a nested `signed-login:` answer is refused.
pub async fn connect_adapter(
    connection_string: &str,
    identity: &ExplorerIdentity,
    scene_id: &str,
    signer: &dyn HandshakeSigner,
    http: &reqwest::Client,
) -> Result<CommsAdapter, RealmError> {
    let (protocol, rest) = AdapterProtocol::parse(connection_string)?;
    match protocol {
        AdapterProtocol::Reliable | AdapterProtocol::WsRoom => Ok(CommsAdapter {
            protocol,
            desired: vec![TransportDescriptor {
                url: connection_string.to_string(),
                scene_id: scene_id.to_string(),
            }],
        }),
        AdapterProtocol::Offline => Ok(CommsAdapter {
            protocol,
            desired: Vec::new(),
        }),
        AdapterProtocol::SignedLogin => {
            let response = signed_handshake(rest, identity, signer, http).await?;
            let Some(fixed_adapter) = response.fixed_adapter else {
                let message = response
                    .message
                    .unwrap_or_else(|| "handshake returned no adapter".to_string());
                return Err(RealmError::AdapterHandshake { message });
            };
            if fixed_adapter.starts_with("signed-login:") {
                return Err(RealmError::AdapterHandshake {
                    message: "handshake answered with another signed-login adapter".to_string(),
                });
            }
            info!("signed handshake resolved adapter {fixed_adapter}");
            let (fixed_protocol, _) = AdapterProtocol::parse(&fixed_adapter)?;
            Ok(CommsAdapter {
                protocol: fixed_protocol,
                desired: vec![TransportDescriptor {
                    url: fixed_adapter,
                    scene_id: scene_id.to_string(),
                }],
            })
        }
    }
}

async fn signed_handshake(
    url: &str,
    identity: &ExplorerIdentity,
    signer: &dyn HandshakeSigner,
    http: &reqwest::Client,
) -> Result<SignedLoginResponse, RealmError> {
    let body = json!({
        "intent": "explorer:comms-handshake",
        "signer": "explorer",
        "isGuest": identity.is_guest,
    })
    .to_string();

    let mut request = http
        .post(url)
        .header("content-type", "application/json")
        .body(body.clone());
    for (name, value) in signer.sign_request("POST", url, &body) {
        request = request.header(name, value);
    }

    let response = request
        .send()
        .await
        .map_err(|e| RealmError::Request(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(RealmError::AdapterHandshake {
            message: format!("handshake endpoint returned status {}", status.as_u16()),
        });
    }
    response
        .json::<SignedLoginResponse>()
        .await
        .map_err(|e| RealmError::Request(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::UnsignedHandshake;

    #[test]
    fn parses_known_protocols_once() {
        assert_eq!(
            AdapterProtocol::parse("ws-room:rooms.example.org/room").unwrap(),
            (AdapterProtocol::WsRoom, "rooms.example.org/room")
        );
        assert_eq!(
            AdapterProtocol::parse("offline:offline").unwrap(),
            (AdapterProtocol::Offline, "offline")
        );
        assert!(matches!(
            AdapterProtocol::parse("carrier-pigeon:coop"),
            Err(RealmError::UnknownAdapterProtocol { .. })
        ));
        assert!(matches!(
            AdapterProtocol::parse("no-scheme-here"),
            Err(RealmError::UnknownAdapterProtocol { .. })
        ));
    }

    #[tokio::test]
    async fn fixed_adapters_yield_a_static_descriptor() {
        let identity = ExplorerIdentity::guest("0xAAA");
        let http = reqwest::Client::new();
        let adapter = connect_adapter(
            "ws-room:rooms.example.org/plaza",
            &identity,
            "scene-1",
            &UnsignedHandshake,
            &http,
        )
        .await
        .unwrap();

        assert_eq!(adapter.protocol(), AdapterProtocol::WsRoom);
        assert_eq!(
            adapter.desired_transports(),
            &[TransportDescriptor {
                url: "ws-room:rooms.example.org/plaza".to_string(),
                scene_id: "scene-1".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn offline_yields_no_transports() {
        let identity = ExplorerIdentity::guest("0xAAA");
        let http = reqwest::Client::new();
        let adapter = connect_adapter(
            "offline:offline",
            &identity,
            "scene-1",
            &UnsignedHandshake,
            &http,
        )
        .await
        .unwrap();
        assert!(adapter.desired_transports().is_empty());
    }
}
