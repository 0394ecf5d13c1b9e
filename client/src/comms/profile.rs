use log::debug;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::oneshot;

use commune_shared::Color3;

/// Errors that can occur while fetching a peer's profile record
#[derive(Debug, Error)]
pub enum ProfileError {
    /// The request never completed
    #[error("Profile request failed: {0}")]
    Request(String),

    /// The endpoint answered with a non-2xx status
    #[error("Profile endpoint returned status {status}")]
    Http { status: u16 },

    /// The endpoint answered but carried no usable record
    #[error("No profile record for address {address}")]
    NotFound { address: String },

    /// The response body could not be decoded
    #[error("Malformed profile response: {0}")]
    Decode(String),
}

/// A versioned identity/appearance record for one address, as served by the
/// profile endpoint. The `version` field is the dedupe/ordering key: caches
/// only ever move forward on it.
#[derive(Debug, Clone, PartialEq)]
pub struct AvatarProfile {
    pub version: u64,
    pub name: String,
    pub has_connected_web3: bool,
    pub body_shape_urn: String,
    pub skin_color: Option<Color3>,
    pub eyes_color: Option<Color3>,
    pub hair_color: Option<Color3>,
}

// JSON shape of the profile endpoint: an array of envelopes, each holding an
// `avatars` list; the first avatar of the first envelope is the record.
#[derive(Deserialize)]
struct ProfileEnvelope {
    #[serde(default)]
    avatars: Vec<AvatarRecord>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AvatarRecord {
    #[serde(default)]
    version: u64,
    name: Option<String>,
    #[serde(default)]
    has_connected_web3: bool,
    avatar: Option<AvatarShape>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AvatarShape {
    body_shape: Option<String>,
    skin: Option<ColoredPart>,
    eyes: Option<ColoredPart>,
    hair: Option<ColoredPart>,
}

#[derive(Deserialize)]
struct ColoredPart {
    color: Option<ColorJson>,
}

#[derive(Deserialize)]
struct ColorJson {
    r: f32,
    g: f32,
    b: f32,
}

impl ColorJson {
    fn into_color(self) -> Color3 {
        Color3::new(self.r, self.g, self.b)
    }
}

fn into_profile(record: AvatarRecord) -> AvatarProfile {
    let shape = record.avatar;
    let part_color = |part: Option<ColoredPart>| part.and_then(|p| p.color).map(|c| c.into_color());
    let (body_shape_urn, skin, eyes, hair) = match shape {
        Some(shape) => (
            shape.body_shape.unwrap_or_default(),
            part_color(shape.skin),
            part_color(shape.eyes),
            part_color(shape.hair),
        ),
        None => (String::new(), None, None, None),
    };
    AvatarProfile {
        version: record.version,
        name: record.name.unwrap_or_default(),
        has_connected_web3: record.has_connected_web3,
        body_shape_urn,
        skin_color: skin,
        eyes_color: eyes,
        hair_color: hair,
    }
}

/// Where profile records come from. The HTTP implementation talks to the
/// realm's profile endpoint; tests substitute an in-memory source.
///
/// Fetches are fire-and-forget: the result lands in the provided oneshot and
/// the owning system polls it from its tick, so no handler ever blocks.
pub trait ProfileFetcher: Send + Sync {
    fn spawn_fetch(
        &self,
        address: &str,
        reply: oneshot::Sender<Result<AvatarProfile, ProfileError>>,
    );
}

/// Fetches profiles over HTTP: `GET <base>/profiles?id=<address>`.
pub struct HttpProfileFetcher {
    base_url: String,
    client: reqwest::Client,
}

impl HttpProfileFetcher {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

impl ProfileFetcher for HttpProfileFetcher {
    fn spawn_fetch(
        &self,
        address: &str,
        reply: oneshot::Sender<Result<AvatarProfile, ProfileError>>,
    ) {
        let url = format!("{}/profiles?id={}", self.base_url, address);
        let client = self.client.clone();
        let address = address.to_string();
        tokio::spawn(async move {
            let result = fetch_profile(client, url, address).await;
            // Receiver may be gone if the peer already left; that is fine.
            let _ = reply.send(result);
        });
    }
}

async fn fetch_profile(
    client: reqwest::Client,
    url: String,
    address: String,
) -> Result<AvatarProfile, ProfileError> {
    debug!("fetching profile for {address}");
    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| ProfileError::Request(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(ProfileError::Http {
            status: status.as_u16(),
        });
    }
    let envelopes: Vec<ProfileEnvelope> = response
        .json()
        .await
        .map_err(|e| ProfileError::Decode(e.to_string()))?;
    envelopes
        .into_iter()
        .next()
        .and_then(|envelope| envelope.avatars.into_iter().next())
        .map(into_profile)
        .ok_or(ProfileError::NotFound { address })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_full_record() {
        let body = r#"[{"avatars":[{
            "version": 4,
            "name": "ada",
            "hasConnectedWeb3": true,
            "avatar": {
                "bodyShape": "urn:shape:female",
                "skin": {"color": {"r": 0.5, "g": 0.4, "b": 0.3}},
                "eyes": {"color": {"r": 0.1, "g": 0.2, "b": 0.9}}
            }
        }]}]"#;
        let envelopes: Vec<ProfileEnvelope> = serde_json::from_str(body).unwrap();
        let profile = into_profile(envelopes.into_iter().next().unwrap().avatars.remove(0));

        assert_eq!(profile.version, 4);
        assert_eq!(profile.name, "ada");
        assert!(profile.has_connected_web3);
        assert_eq!(profile.body_shape_urn, "urn:shape:female");
        assert_eq!(profile.skin_color, Some(Color3::new(0.5, 0.4, 0.3)));
        assert_eq!(profile.hair_color, None);
    }

    #[test]
    fn missing_fields_default() {
        let body = r#"[{"avatars":[{"name": "bo"}]}]"#;
        let envelopes: Vec<ProfileEnvelope> = serde_json::from_str(body).unwrap();
        let profile = into_profile(envelopes.into_iter().next().unwrap().avatars.remove(0));

        assert_eq!(profile.version, 0);
        assert!(!profile.has_connected_web3);
        assert_eq!(profile.body_shape_urn, "");
    }
}
