//! client_list and client_close tool implementations.
//!
//! Open app instances register implicitly through proxy_fetch's `client_id`.

use std::sync::Arc;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;
use portal_client::{ClientRegistry, proxy::ClientInfo};

/// Output from the client_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientListOutput {
    /// Cache version that newly opened clients are controlled by.
    pub active_controller: Option<String>,
    pub clients: Vec<ClientInfo>,
}

/// Parameters for the client_close tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientCloseParams {
    pub client_id: String,
}

/// Output from the client_close tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientCloseOutput {
    pub client_id: String,
    /// False if the client was not registered.
    pub removed: bool,
}

pub async fn list_impl(clients: &Arc<ClientRegistry>) -> Result<CallToolResult, McpError> {
    let active_controller = clients.active_controller().await;
    Ok(json_result(&ClientListOutput { active_controller, clients: clients.list().await })?)
}

pub async fn close_impl(
    clients: &Arc<ClientRegistry>, params: ClientCloseParams,
) -> Result<CallToolResult, McpError> {
    let removed = clients.remove(&params.client_id).await;
    tracing::debug!(client_id = %params.client_id, removed, "client closed");
    Ok(json_result(&ClientCloseOutput { client_id: params.client_id, removed })?)
}
