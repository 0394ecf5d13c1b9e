mod about;
mod adapter;
mod error;
mod orchestrator;
mod resolution;

pub use about::{AboutComms, AboutConfigurations, AboutResponse, CurrentRealm};
pub use adapter::{connect_adapter, AdapterProtocol, CommsAdapter, TransportDescriptor};
pub use error::RealmError;
pub use orchestrator::RealmCommunications;
pub use resolution::resolve_realm_base_url;
