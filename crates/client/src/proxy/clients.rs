//! Registry of open application instances.
//!
//! Activation claims every registered client so later requests from pages
//! that were already open are routed through the new cache version without
//! a reload.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use portal_core::Error;

/// Capability to take control of open application instances.
#[async_trait]
pub trait ClientControl: Send + Sync {
    /// Mark every open client as controlled by `controller`.
    ///
    /// Returns the number of clients now controlled.
    async fn claim(&self, controller: &str) -> Result<usize, Error>;
}

/// An open application instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ClientInfo {
    pub id: String,
    /// Cache version routing this client's requests, if any.
    pub controller: Option<String>,
    pub registered_at: String,
}

/// In-memory client registry.
///
/// Clients that register after a claim are controlled immediately, the way a
/// page opened under an active proxy is.
#[derive(Debug, Clone, Default)]
pub struct ClientRegistry {
    clients: Arc<RwLock<HashMap<String, ClientInfo>>>,
    active: Arc<RwLock<Option<String>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client, or return the existing record for `id`.
    pub async fn register(&self, id: &str) -> ClientInfo {
        let active = self.active.read().await.clone();
        let mut clients = self.clients.write().await;
        clients
            .entry(id.to_string())
            .or_insert_with(|| ClientInfo {
                id: id.to_string(),
                controller: active,
                registered_at: Utc::now().to_rfc3339(),
            })
            .clone()
    }

    /// Forget a closed client.
    pub async fn remove(&self, id: &str) -> bool {
        self.clients.write().await.remove(id).is_some()
    }

    pub async fn get(&self, id: &str) -> Option<ClientInfo> {
        self.clients.read().await.get(id).cloned()
    }

    /// All clients ordered by id.
    pub async fn list(&self) -> Vec<ClientInfo> {
        let mut clients: Vec<_> = self.clients.read().await.values().cloned().collect();
        clients.sort_by(|a, b| a.id.cmp(&b.id));
        clients
    }

    /// The controller new clients inherit.
    pub async fn active_controller(&self) -> Option<String> {
        self.active.read().await.clone()
    }
}

#[async_trait]
impl ClientControl for ClientRegistry {
    async fn claim(&self, controller: &str) -> Result<usize, Error> {
        *self.active.write().await = Some(controller.to_string());

        let mut clients = self.clients.write().await;
        for client in clients.values_mut() {
            client.controller = Some(controller.to_string());
        }

        tracing::debug!(controller, clients = clients.len(), "claimed open clients");
        Ok(clients.len())
    }
}
