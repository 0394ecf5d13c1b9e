use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use log::{error, info, warn};

use commune_shared::PlayerEntityAllocator;

use crate::{
    comms::{AvatarSyncSystem, ProfileCache, ProfileFetcher},
    identity::{ExplorerIdentity, HandshakeSigner},
    transport::{RoomSocketConnector, RoomTransport, TransportEvent},
};

use super::{
    about::{AboutResponse, CurrentRealm},
    adapter::{connect_adapter, CommsAdapter, TransportDescriptor},
    error::RealmError,
    resolution::resolve_realm_base_url,
};

/// Fallback adapter for realms that advertise no communications at all.
const OFFLINE_ADAPTER: &str = "offline:offline";

/// One connected transport plus the avatar sync system that consumes its
/// events. `draining` marks transports whose disconnect was requested; they
/// stay in the active set until their terminal event arrives.
struct ActiveTransport {
    transport: RoomTransport,
    sync: AvatarSyncSystem,
    draining: bool,
}

/// Owns the current realm, the negotiated adapter, and the active transport
/// set, reconciling desired against active transports each tick.
///
/// The allocator and profile cache are session-scoped services created here
/// and handed to every avatar sync system by reference; they live as long as
/// the orchestrator.
pub struct RealmCommunications {
    identity: ExplorerIdentity,
    signer: Arc<dyn HandshakeSigner>,
    connector: Arc<dyn RoomSocketConnector>,
    fetcher: Arc<dyn ProfileFetcher>,
    http: reqwest::Client,
    allocator: Arc<RwLock<PlayerEntityAllocator>>,
    profile_cache: Arc<RwLock<ProfileCache>>,
    current_realm: Option<CurrentRealm>,
    current_adapter: Option<CommsAdapter>,
    active: HashMap<String, ActiveTransport>,
}

impl RealmCommunications {
    pub fn new(
        identity: ExplorerIdentity,
        signer: Arc<dyn HandshakeSigner>,
        connector: Arc<dyn RoomSocketConnector>,
        fetcher: Arc<dyn ProfileFetcher>,
    ) -> Self {
        Self {
            identity,
            signer,
            connector,
            fetcher,
            http: reqwest::Client::new(),
            allocator: Arc::new(RwLock::new(PlayerEntityAllocator::new())),
            profile_cache: Arc::new(RwLock::new(ProfileCache::new())),
            current_realm: None,
            current_adapter: None,
            active: HashMap::new(),
        }
    }

    pub fn current_realm(&self) -> Option<&CurrentRealm> {
        self.current_realm.as_ref()
    }

    pub fn allocator(&self) -> Arc<RwLock<PlayerEntityAllocator>> {
        self.allocator.clone()
    }

    pub fn active_transport_urls(&self) -> Vec<String> {
        self.active.keys().cloned().collect()
    }

    /// Resolves `realm` to its base endpoint, fetches its metadata, and
    /// negotiates the matching adapter. On any failure the previous realm and
    /// adapter stay current.
    pub async fn set_realm(&mut self, realm: &str) -> Result<&CurrentRealm, RealmError> {
        let base_url = resolve_realm_base_url(realm)?;
        let base_url = base_url.trim_end_matches('/').to_string();

        let about_url = format!("{base_url}/about");
        let response = self
            .http
            .get(&about_url)
            .send()
            .await
            .map_err(|e| RealmError::Request(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(RealmError::MetadataUnavailable {
                url: about_url,
                status: status.as_u16(),
            });
        }
        let about: AboutResponse = response
            .json()
            .await
            .map_err(|e| RealmError::Request(e.to_string()))?;

        let connection_string = about
            .comms
            .as_ref()
            .and_then(|comms| comms.fixed_adapter.clone())
            .unwrap_or_else(|| OFFLINE_ADAPTER.to_string());

        let adapter = connect_adapter(
            &connection_string,
            &self.identity,
            "realm",
            self.signer.as_ref(),
            &self.http,
        )
        .await?;

        // Commit only now: the new realm and adapter replace the old ones
        // together, and the old adapter is torn down.
        if let Some(mut old) = self.current_adapter.take() {
            old.disconnect();
        }
        self.current_adapter = Some(adapter);
        self.current_realm = Some(CurrentRealm {
            base_url,
            connection_string: realm.to_string(),
            about,
        });
        info!("realm set to {realm}");
        Ok(self.current_realm.as_ref().unwrap())
    }

    fn desired_transports(&self) -> Vec<TransportDescriptor> {
        // For now the desired set comes from the adapter alone; scenes may
        // contribute their own descriptors later.
        self.current_adapter
            .as_ref()
            .map(|adapter| adapter.desired_transports().to_vec())
            .unwrap_or_default()
    }

    /// One tick of reconciliation: initiate disconnects for transports no
    /// longer desired, connect newly desired ones, drain every transport's
    /// events into its sync system, and evict transports whose terminal
    /// event arrived.
    pub fn update(&mut self) {
        let desired = self.desired_transports();

        // Initiate disconnects for the no-longer-desired. Eviction waits for
        // the terminal event below.
        for (url, active) in self.active.iter_mut() {
            if active.draining {
                continue;
            }
            if !desired.iter().any(|d| &d.url == url) {
                info!("disconnecting transport no longer desired: {url}");
                if let Err(e) = active.transport.disconnect() {
                    error!("disconnect of {url} failed: {e}");
                }
                active.draining = true;
            }
        }

        // Connect the missing.
        for descriptor in &desired {
            if self.active.contains_key(&descriptor.url) {
                continue;
            }
            match RoomTransport::new(&descriptor.url, &descriptor.scene_id, self.connector.as_ref())
            {
                Ok(mut transport) => match transport.connect() {
                    Ok(()) => {
                        let sync = AvatarSyncSystem::new(
                            self.allocator.clone(),
                            self.profile_cache.clone(),
                            self.fetcher.clone(),
                        );
                        self.active.insert(
                            descriptor.url.clone(),
                            ActiveTransport {
                                transport,
                                sync,
                                draining: false,
                            },
                        );
                    }
                    Err(e) => error!("could not connect to {}: {e}", descriptor.url),
                },
                Err(e) => error!("could not create transport for {}: {e}", descriptor.url),
            }
        }

        // Drain events; a terminal event evicts the transport.
        let mut finished = Vec::new();
        for (url, active) in self.active.iter_mut() {
            while let Some(event) = active.transport.poll_event() {
                match event {
                    TransportEvent::Disconnected { kicked } => {
                        if kicked {
                            warn!("kicked from {url} (duplicate identity elsewhere?)");
                        } else if !active.draining {
                            warn!("transport {url} dropped");
                        }
                        finished.push(url.clone());
                    }
                    other => active.sync.handle_transport_event(&other),
                }
            }
            active.sync.update();
        }
        for url in finished {
            if let Some(mut active) = self.active.remove(&url) {
                active.sync.dispose();
                info!("removed disconnected transport {url}");
            }
        }
    }

    /// Mutable access to the sync system behind an active transport URL.
    pub fn sync_system(&mut self, url: &str) -> Option<&mut AvatarSyncSystem> {
        self.active.get_mut(url).map(|active| &mut active.sync)
    }

    /// Full teardown: disconnects every transport and clears the session
    /// services.
    pub fn dispose(&mut self) {
        for (url, active) in self.active.iter_mut() {
            if let Err(e) = active.transport.disconnect() {
                error!("disconnect of {url} failed during dispose: {e}");
            }
        }
        self.active.clear();
        if let Some(mut adapter) = self.current_adapter.take() {
            adapter.disconnect();
        }
        self.allocator.write().unwrap().clear();
        self.profile_cache.write().unwrap().clear();
    }
}
