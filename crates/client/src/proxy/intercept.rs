//! Fetch interception: cache first, then network, then offline page.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use super::CacheProxy;
use crate::fetch::ProxyRequest;
use portal_core::{CacheRequest, StoredResponse};

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Cache,
    Network,
    OfflineFallback,
    /// Network failed and nothing could stand in for it.
    Unavailable,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSource::Cache => "cache",
            ResponseSource::Network => "network",
            ResponseSource::OfflineFallback => "offline_fallback",
            ResponseSource::Unavailable => "unavailable",
        }
    }
}

/// A request the proxy answered.
#[derive(Debug)]
pub struct Responded {
    /// None when the network failed and no fallback applied.
    pub response: Option<StoredResponse>,
    pub source: ResponseSource,
    /// Background write of a freshly fetched response.
    ///
    /// Dropping the handle leaves the write running.
    pub persist: Option<JoinHandle<()>>,
}

impl Responded {
    fn immediate(response: Option<StoredResponse>, source: ResponseSource) -> Self {
        Self { response, source, persist: None }
    }
}

/// What the host should do with an intercepted request.
#[derive(Debug)]
pub enum FetchDecision {
    /// Not handled; send to the network as if no proxy existed.
    PassThrough,
    Respond(Responded),
}

impl CacheProxy {
    /// Answer an intercepted request.
    ///
    /// Never fails: cache read errors count as misses and network failures
    /// turn into the offline page or an empty result.
    pub async fn handle_fetch(&self, request: &ProxyRequest) -> FetchDecision {
        if request.method != Method::GET {
            return FetchDecision::PassThrough;
        }

        let bucket = &self.settings.cache_name;
        let key = request.to_cache_request();

        match self.db.match_entry(bucket, &key).await {
            Ok(Some(cached)) => {
                tracing::debug!(url = %request.url, "cache hit");
                return FetchDecision::Respond(Responded::immediate(Some(cached), ResponseSource::Cache));
            }
            Ok(None) => tracing::debug!(url = %request.url, "cache miss"),
            Err(e) => tracing::warn!(url = %request.url, error = %e, "cache lookup failed; treating as miss"),
        }

        let response = match self.network.fetch(request).await {
            Ok(response) => response,
            Err(e) => {
                if e.is_network_failure() {
                    tracing::debug!(url = %request.url, mode = %request.mode, error = %e, "network fetch failed");
                } else {
                    tracing::warn!(url = %request.url, mode = %request.mode, error = %e, "fetch failed");
                }
                return FetchDecision::Respond(self.fallback(request).await);
            }
        };

        if !response.is_cacheable() {
            return FetchDecision::Respond(Responded::immediate(Some(response), ResponseSource::Network));
        }

        let persist = self.persist(key, response.clone());
        FetchDecision::Respond(Responded {
            response: Some(response),
            source: ResponseSource::Network,
            persist: Some(persist),
        })
    }

    /// Store a copy of a fetched response without holding up the caller.
    fn persist(&self, key: CacheRequest, response: StoredResponse) -> JoinHandle<()> {
        let db = self.db.clone();
        let bucket = self.settings.cache_name.clone();
        tokio::spawn(async move {
            match db.put_entry(&bucket, &key, &response).await {
                Ok(()) => tracing::debug!(url = %key.url, "stored network response"),
                Err(e) => tracing::warn!(url = %key.url, error = %e, "failed to store network response"),
            }
        })
    }

    async fn fallback(&self, request: &ProxyRequest) -> Responded {
        if !request.is_navigation() {
            return Responded::immediate(None, ResponseSource::Unavailable);
        }

        let offline = CacheRequest::get(self.settings.offline_url.as_str());
        match self.db.match_entry(&self.settings.cache_name, &offline).await {
            Ok(Some(page)) => Responded::immediate(Some(page), ResponseSource::OfflineFallback),
            Ok(None) => {
                tracing::warn!(offline_url = %self.settings.offline_url, "offline page not cached");
                Responded::immediate(None, ResponseSource::Unavailable)
            }
            Err(e) => {
                tracing::warn!(error = %e, "offline page lookup failed");
                Responded::immediate(None, ResponseSource::Unavailable)
            }
        }
    }
}
