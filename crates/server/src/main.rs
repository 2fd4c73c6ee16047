//! portal-proxy server entry point.
//!
//! Opens the cache store, resolves the asset manifest against the configured
//! app scope and serves the proxy over MCP on stdio.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

use portal_client::{CacheProxy, ClientRegistry, FetchClient, FetchConfig, ProxySettings};
use portal_core::{AppConfig, CacheDb};

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    let scope = config.scope()?;

    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening cache store at {}", config.db_path.display()))?;
    let network = Arc::new(FetchClient::new(FetchConfig::from_app_config(&config)?)?);
    let clients = Arc::new(ClientRegistry::new());
    let settings = ProxySettings::from_manifest(&scope)?;

    tracing::info!(
        scope = %scope,
        cache = %settings.cache_name,
        assets = settings.assets.len(),
        "Starting portal-proxy on stdio transport"
    );

    let proxy = CacheProxy::new(db, network, clients.clone(), settings);
    let handler = handler::PortalProxyServer::new(proxy, clients);
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;

    Ok(())
}
