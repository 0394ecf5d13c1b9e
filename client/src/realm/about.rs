use serde::Deserialize;

/// Session/transport metadata served by a realm's `/about` endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AboutResponse {
    pub comms: Option<AboutComms>,
    pub configurations: Option<AboutConfigurations>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AboutComms {
    pub protocol: Option<String>,
    /// The adapter connection string participants should negotiate with.
    pub fixed_adapter: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AboutConfigurations {
    pub realm_name: Option<String>,
}

/// The realm this session is currently pointed at.
#[derive(Debug, Clone)]
pub struct CurrentRealm {
    /// Canonical base endpoint, no trailing slash.
    pub base_url: String,
    /// The identifier the user asked for, before resolution.
    pub connection_string: String,
    pub about: AboutResponse,
}
