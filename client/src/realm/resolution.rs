use super::error::RealmError;

const WORLD_NAME_SUFFIX: &str = ".dcl.eth";
const ENS_SUFFIX: &str = ".eth";
const WORLDS_CONTENT_SERVER: &str = "https://worlds-content-server.decentraland.org/world/";

fn is_alnum(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric())
}

/// `<alnum>.dcl.eth`: a platform world name.
fn is_world_name(s: &str) -> bool {
    s.strip_suffix(WORLD_NAME_SUFFIX).is_some_and(is_alnum)
}

/// `<alnum>.eth`: a bare ENS name (not a world name).
fn is_ens_name(s: &str) -> bool {
    s.strip_suffix(ENS_SUFFIX).is_some_and(is_alnum)
}

fn url_with_protocol(url_or_hostname: &str) -> Result<String, RealmError> {
    if url_or_hostname.starts_with('/') {
        // A bare path has no host to connect to.
        return Err(RealmError::Resolution {
            input: url_or_hostname.to_string(),
            reason: "relative path is not a realm endpoint",
        });
    }
    if let Some(rest) = url_or_hostname.strip_prefix("://") {
        return Ok(format!("http://{rest}"));
    }
    if url_or_hostname.starts_with("http://") || url_or_hostname.starts_with("https://") {
        return Ok(url_or_hostname.to_string());
    }
    // No scheme given: default to the secure one.
    Ok(format!("https://{url_or_hostname}"))
}

/// Resolves an opaque realm identifier (world name, ENS name, URL, or bare
/// hostname) to a canonical base endpoint, longest match first.
pub fn resolve_realm_base_url(realm: &str) -> Result<String, RealmError> {
    if is_world_name(realm) {
        return Ok(format!("{WORLDS_CONTENT_SERVER}{}", realm.to_lowercase()));
    }
    if is_ens_name(realm) {
        // ENS realm records are not resolvable yet; fall through and treat
        // the name as a hostname.
    }
    url_with_protocol(realm)
}
