//! MCP server handler implementation.
//!
//! This module defines the server handler that routes proxy events and cache
//! inspection calls to the tool implementations.
use std::sync::Arc;

use crate::tools::cache::{CacheDeleteParams, CacheGetParams, CacheListParams, delete_impl, get_impl, list_impl};
use crate::tools::clients::{self, ClientCloseParams};
use crate::tools::fetch::{ProxyFetchParams, fetch_impl};
use crate::tools::lifecycle::{activate_impl, install_impl};
use portal_client::{CacheProxy, ClientRegistry};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The MCP server handler for portal-proxy.
#[derive(Clone)]
pub struct PortalProxyServer {
    proxy: CacheProxy,
    clients: Arc<ClientRegistry>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
#[tool_router]
impl PortalProxyServer {
    /// Create a server over a proxy and the registry its clients live in.
    pub fn new(proxy: CacheProxy, clients: Arc<ClientRegistry>) -> Self {
        Self { proxy, clients, tool_router: Self::tool_router() }
    }

    /// Install the current cache version.
    ///
    /// Fetches every manifest asset and stores them as one batch, then
    /// activates immediately.
    #[tool(
        description = "Install the current cache version: fetch every app-shell asset and store them atomically, then activate. Fails without changes if any asset fails."
    )]
    async fn proxy_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.proxy).await
    }

    #[tool(description = "Activate the current cache version: delete stale cache buckets and claim open clients.")]
    async fn proxy_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.proxy).await
    }

    /// Route a request through the cache-first proxy.
    #[tool(
        description = "Fetch a URL through the offline proxy. GET requests are served from cache first, then the network (storing same-origin 200s), then the offline page for navigations. Other methods go straight to the network."
    )]
    async fn proxy_fetch(&self, params: Parameters<ProxyFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.proxy, &self.clients, params.0).await
    }

    #[tool(description = "List cache buckets, marking the current version. Pass a bucket to also list its entries.")]
    async fn cache_list(&self, params: Parameters<CacheListParams>) -> Result<CallToolResult, McpError> {
        list_impl(&self.proxy, params.0).await
    }

    #[tool(description = "Look up a URL in a cache bucket without touching the network. Errors on a miss.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.proxy, params.0).await
    }

    #[tool(description = "List open app instances and the cache version controlling each.")]
    async fn client_list(&self) -> Result<CallToolResult, McpError> {
        clients::list_impl(&self.clients).await
    }

    #[tool(description = "Forget a closed app instance so later requests with its id register afresh.")]
    async fn client_close(&self, params: Parameters<ClientCloseParams>) -> Result<CallToolResult, McpError> {
        clients::close_impl(&self.clients, params.0).await
    }

    #[tool(description = "Delete a cache bucket and all of its entries, or only the entry for a given URL.")]
    async fn cache_delete(&self, params: Parameters<CacheDeleteParams>) -> Result<CallToolResult, McpError> {
        delete_impl(&self.proxy, params.0).await
    }
}

impl ServerHandler for PortalProxyServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "portal-proxy".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
