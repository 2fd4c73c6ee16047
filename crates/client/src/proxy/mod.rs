//! Cache-first offline proxy.
//!
//! ### Lifecycle
//! - **install**: open the current bucket and store every manifest asset as
//!   one batch. Any failed asset fails the whole install and nothing is
//!   written. A successful install asks to be activated right away.
//! - **activate**: delete every bucket except the current one, then claim
//!   open clients.
//!
//! ### Fetch interception
//! - Non-GET requests pass through untouched.
//! - Cache hit: served without touching the network.
//! - Cache miss: fetched; a 200 `basic` response is stored by a detached task
//!   while the caller gets its copy immediately.
//! - Network failure: navigations get the cached offline page, everything
//!   else gets an empty result.
//!
//! Handlers hold no state between calls beyond the cache itself.

pub mod clients;
mod intercept;
mod lifecycle;

pub use clients::{ClientControl, ClientInfo, ClientRegistry};
pub use intercept::{FetchDecision, Responded, ResponseSource};
pub use lifecycle::{ActivateReport, InstallReport};

use std::sync::Arc;

use ::url::Url;
use portal_core::manifest::{ASSETS_TO_CACHE, CACHE_NAME, OFFLINE_URL};
use portal_core::{CacheDb, Error, StoredResponse};

use crate::fetch::{Network, ProxyRequest, resolve};

/// The proxy's fixed configuration, resolved against the app scope.
#[derive(Debug, Clone)]
pub struct ProxySettings {
    /// App origin and base path relative references resolve against.
    pub scope: Url,
    /// Current bucket name. Every other bucket is stale.
    pub cache_name: String,
    pub offline_url: Url,
    /// Manifest assets in declaration order.
    pub assets: Vec<Url>,
}

impl ProxySettings {
    /// Resolve the compiled-in manifest against `scope`.
    pub fn from_manifest(scope: &Url) -> Result<Self, Error> {
        Self::resolve(scope, CACHE_NAME, OFFLINE_URL, ASSETS_TO_CACHE)
    }

    /// Resolve an arbitrary version, offline page and asset list.
    pub fn resolve(scope: &Url, cache_name: &str, offline_url: &str, assets: &[&str]) -> Result<Self, Error> {
        let to_url = |input: &str| resolve(scope, input).map_err(|e| Error::InvalidUrl(format!("{input}: {e}")));

        Ok(Self {
            scope: scope.clone(),
            cache_name: cache_name.to_string(),
            offline_url: to_url(offline_url)?,
            assets: assets.iter().map(|asset| to_url(asset)).collect::<Result<_, _>>()?,
        })
    }

    /// Resolve a URL or scope-relative path the way manifest entries are.
    pub fn resolve_url(&self, input: &str) -> Result<Url, Error> {
        resolve(&self.scope, input).map_err(|e| Error::InvalidUrl(format!("{input}: {e}")))
    }
}

/// Cache-first proxy over a cache store, a network and a client registry.
#[derive(Clone)]
pub struct CacheProxy {
    db: CacheDb,
    network: Arc<dyn Network>,
    clients: Arc<dyn ClientControl>,
    settings: ProxySettings,
}

impl CacheProxy {
    pub fn new(
        db: CacheDb, network: Arc<dyn Network>, clients: Arc<dyn ClientControl>, settings: ProxySettings,
    ) -> Self {
        Self { db, network, clients, settings }
    }

    pub fn settings(&self) -> &ProxySettings {
        &self.settings
    }

    pub fn cache(&self) -> &CacheDb {
        &self.db
    }

    /// Send a request straight to the network, bypassing the cache.
    pub async fn pass_through(&self, request: &ProxyRequest) -> Result<StoredResponse, Error> {
        self.network.fetch(request).await
    }
}
