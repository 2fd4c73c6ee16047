//! Client side of portal-proxy.
//!
//! This crate provides the network capability the proxy fetches through,
//! the registry of open application instances, and the cache-first
//! [`CacheProxy`] that ties them to the cache storage in `portal-core`.

pub mod fetch;
pub mod proxy;

pub use reqwest::Method;

pub use fetch::{FetchClient, FetchConfig, Network, ProxyRequest, RequestMode};
pub use proxy::{
    ActivateReport, CacheProxy, ClientControl, ClientRegistry, FetchDecision, InstallReport, ProxySettings, Responded,
    ResponseSource,
};
