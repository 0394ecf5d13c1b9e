/// Who this client is in the session. The cryptographic auth chain behind
/// the address lives outside this crate; handshakes that need signatures go
/// through [`HandshakeSigner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplorerIdentity {
    pub address: String,
    pub is_guest: bool,
}

impl ExplorerIdentity {
    pub fn guest(address: &str) -> Self {
        Self {
            address: address.to_lowercase(),
            is_guest: true,
        }
    }
}

/// Produces the signed headers for an authenticated handshake request.
/// Implemented outside this crate by whatever owns the user's key material.
pub trait HandshakeSigner: Send + Sync {
    fn sign_request(&self, method: &str, url: &str, body: &str) -> Vec<(String, String)>;
}

/// A signer for guest sessions: no key material, no headers.
pub struct UnsignedHandshake;

impl HandshakeSigner for UnsignedHandshake {
    fn sign_request(&self, _method: &str, _url: &str, _body: &str) -> Vec<(String, String)> {
        Vec::new()
    }
}
