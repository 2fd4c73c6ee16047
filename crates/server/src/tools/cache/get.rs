//! cache_get tool implementation.
//!
//! Looks up a URL in a bucket without touching the network.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::{ResponseView, json_result};
use portal_client::CacheProxy;
use portal_core::{CacheRequest, Error};

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Absolute URL or path relative to the app scope.
    pub url: String,

    /// Bucket to search (default: the current cache version).
    #[serde(default)]
    pub bucket: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub bucket: String,
    pub response: ResponseView,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(proxy: &CacheProxy, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let url = proxy.settings().resolve_url(&params.url)?;
    let bucket = params
        .bucket
        .unwrap_or_else(|| proxy.settings().cache_name.clone());

    let response = proxy
        .cache()
        .match_entry(&bucket, &CacheRequest::get(url.as_str()))
        .await?
        .ok_or_else(|| Error::CacheMiss(format!("{url} in {bucket}")))?;

    let output = CacheGetOutput { bucket, response: ResponseView::from(&response) };
    Ok(json_result(&output)?)
}
