//! proxy_fetch tool implementation.
//!
//! Delivers one intercepted request to the proxy and reports where the
//! answer came from.

use std::collections::BTreeMap;
use std::sync::Arc;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;
use crate::tools::{ResponseView, json_result};
use portal_client::{CacheProxy, ClientRegistry, FetchDecision, Method, ProxyRequest, RequestMode};

fn default_method() -> String {
    "GET".to_string()
}

/// Parameters for the proxy_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProxyFetchParams {
    /// Absolute URL or path relative to the app scope.
    pub url: String,

    /// HTTP method (default: GET). Anything but GET bypasses the cache.
    #[serde(default = "default_method")]
    pub method: String,

    /// Request mode: navigate, same-origin, no-cors or cors (default: cors).
    #[serde(default)]
    pub mode: RequestMode,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Request body, sent only on pass-through.
    #[serde(default)]
    pub body: Option<String>,

    /// Identifier of the open app instance making the request.
    ///
    /// A client not yet claimed by the current cache version bypasses the
    /// proxy. Requests without an id are always intercepted.
    #[serde(default)]
    pub client_id: Option<String>,
}

/// Output from the proxy_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProxyFetchOutput {
    /// cache, network, offline_fallback, unavailable or pass_through.
    pub source: String,
    /// Absent when the network failed and nothing stood in for it.
    pub response: Option<ResponseView>,
    /// Cache version controlling the calling client, if one was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller: Option<String>,
}

impl ProxyFetchParams {
    fn into_request(self, proxy: &CacheProxy) -> Result<ProxyRequest, McpError> {
        let url = proxy.settings().resolve_url(&self.url)?;
        let method = Method::from_bytes(self.method.trim().to_ascii_uppercase().as_bytes())
            .map_err(|_| ToolError::InvalidInput(format!("invalid method: {}", self.method)))?;

        let mut request = match self.mode {
            RequestMode::Navigate if method == Method::GET => ProxyRequest::navigate(url),
            mode => ProxyRequest::new(method, url).with_mode(mode),
        };
        for (name, value) in &self.headers {
            request = request.with_header(name, value)?;
        }
        if let Some(body) = self.body {
            request = request.with_body(body);
        }
        Ok(request)
    }
}

/// Implementation of the proxy_fetch tool.
pub async fn fetch_impl(
    proxy: &CacheProxy, clients: &Arc<ClientRegistry>, params: ProxyFetchParams,
) -> Result<CallToolResult, McpError> {
    let controller = match &params.client_id {
        Some(id) => clients.register(id).await.controller,
        None => None,
    };
    let uncontrolled =
        params.client_id.is_some() && controller.as_deref() != Some(proxy.settings().cache_name.as_str());
    let request = params.into_request(proxy)?;

    tracing::debug!(method = %request.method, url = %request.url, mode = %request.mode, uncontrolled, "proxy_fetch");

    let decision = if uncontrolled { FetchDecision::PassThrough } else { proxy.handle_fetch(&request).await };
    let output = match decision {
        FetchDecision::PassThrough => {
            let response = proxy.pass_through(&request).await?;
            ProxyFetchOutput {
                source: "pass_through".to_string(),
                response: Some(ResponseView::from(&response)),
                controller,
            }
        }
        FetchDecision::Respond(responded) => ProxyFetchOutput {
            source: responded.source.as_str().to_string(),
            response: responded.response.as_ref().map(ResponseView::from),
            controller,
        },
    };

    Ok(json_result(&output)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{offline_proxy, output};
    use portal_core::{CacheRequest, ResponseType, StoredResponse};

    fn params(url: &str) -> ProxyFetchParams {
        ProxyFetchParams {
            url: url.to_string(),
            method: default_method(),
            mode: RequestMode::default(),
            headers: BTreeMap::new(),
            body: None,
            client_id: None,
        }
    }

    fn page(url: &str, body: &str) -> StoredResponse {
        StoredResponse {
            url: url.to_string(),
            status: 200,
            status_text: "OK".to_string(),
            response_type: ResponseType::Basic,
            headers: vec![("content-type".to_string(), "text/html".to_string())],
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_params_defaults() {
        let params: ProxyFetchParams = serde_json::from_str(r#"{"url": "./index.html"}"#).unwrap();
        assert_eq!(params.method, "GET");
        assert_eq!(params.mode, RequestMode::Cors);
        assert!(params.headers.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_served_from_cache() {
        let (proxy, clients) = offline_proxy().await;
        let url = "http://127.0.0.1:1/app/index.tsx";
        proxy
            .cache()
            .put_entry("v4", &CacheRequest::get(url), &page(url, "export {}"))
            .await
            .unwrap();

        let result = fetch_impl(&proxy, &clients, params("./index.tsx")).await.unwrap();
        let out: ProxyFetchOutput = output(&result);

        assert_eq!(out.source, "cache");
        assert_eq!(out.response.unwrap().body, "export {}");
    }

    #[tokio::test]
    async fn test_offline_navigation_falls_back() {
        let (proxy, clients) = offline_proxy().await;
        let offline = "http://127.0.0.1:1/app/index.html";
        proxy
            .cache()
            .put_entry("v4", &CacheRequest::get(offline), &page(offline, "<h1>offline</h1>"))
            .await
            .unwrap();

        let mut p = params("./settings/profile");
        p.mode = RequestMode::Navigate;
        let result = fetch_impl(&proxy, &clients, p).await.unwrap();
        let out: ProxyFetchOutput = output(&result);

        assert_eq!(out.source, "offline_fallback");
        assert_eq!(out.response.unwrap().body, "<h1>offline</h1>");
    }

    #[tokio::test]
    async fn test_offline_subresource_unavailable() {
        let (proxy, clients) = offline_proxy().await;

        let result = fetch_impl(&proxy, &clients, params("./assets/chunk.js")).await.unwrap();
        let out: ProxyFetchOutput = output(&result);

        assert_eq!(out.source, "unavailable");
        assert!(out.response.is_none());
    }

    #[tokio::test]
    async fn test_post_passes_through_to_network() {
        let (proxy, clients) = offline_proxy().await;
        let mut p = params("./api/chat");
        p.method = "post".to_string();
        p.body = Some("{}".to_string());

        let result = fetch_impl(&proxy, &clients, p).await;
        assert!(result.is_err());
        assert!(proxy.cache().bucket_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_method_rejected() {
        let (proxy, clients) = offline_proxy().await;
        let mut p = params("./index.html");
        p.method = "GE T".to_string();

        assert!(fetch_impl(&proxy, &clients, p).await.is_err());
    }

    #[tokio::test]
    async fn test_unclaimed_client_bypasses_cache_until_activation() {
        let (proxy, clients) = offline_proxy().await;
        let url = "http://127.0.0.1:1/app/index.tsx";
        proxy
            .cache()
            .put_entry("v4", &CacheRequest::get(url), &page(url, "export {}"))
            .await
            .unwrap();

        let mut p = params("./index.tsx");
        p.client_id = Some("tab-1".to_string());
        assert!(fetch_impl(&proxy, &clients, p.clone()).await.is_err());

        crate::tools::lifecycle::activate_impl(&proxy).await.unwrap();

        let out: ProxyFetchOutput = output(&fetch_impl(&proxy, &clients, p).await.unwrap());
        assert_eq!(out.source, "cache");
        assert_eq!(out.controller.as_deref(), Some("v4"));
    }

    #[tokio::test]
    async fn test_client_registered_with_controller() {
        let (proxy, clients) = offline_proxy().await;
        proxy.activate().await.unwrap();

        let mut p = params("./missing.js");
        p.client_id = Some("tab-1".to_string());
        let result = fetch_impl(&proxy, &clients, p).await.unwrap();
        let out: ProxyFetchOutput = output(&result);

        assert_eq!(out.controller.as_deref(), Some("v4"));
        assert!(clients.get("tab-1").await.is_some());
    }
}
