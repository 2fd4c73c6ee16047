//! MCP tool implementations.
//!
//! Lifecycle and fetch tools deliver proxy events; cache tools inspect and
//! prune the bucket store; client tools track open app instances.

pub mod cache;
pub mod clients;
pub mod fetch;
pub mod lifecycle;

use rmcp::model::{CallToolResult, Content};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;
use portal_core::StoredResponse;

/// A response as returned to MCP clients.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResponseView {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub response_type: String,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8 (lossy).
    pub body: String,
    pub body_bytes: usize,
}

impl From<&StoredResponse> for ResponseView {
    fn from(response: &StoredResponse) -> Self {
        Self {
            url: response.url.clone(),
            status: response.status,
            status_text: response.status_text.clone(),
            response_type: response.response_type.to_string(),
            headers: response.headers.clone(),
            body: response.text(),
            body_bytes: response.body.len(),
        }
    }
}

/// Serialize tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, ToolError> {
    let json = serde_json::to_string_pretty(output)?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
