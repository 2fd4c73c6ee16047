//! cache_delete tool implementation.
//!
//! Deletes a bucket and every entry in it, or a single entry.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;
use portal_client::CacheProxy;
use portal_core::{CacheRequest, Error};

/// Parameters for the cache_delete tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheDeleteParams {
    /// Name of the bucket.
    pub bucket: String,

    /// Delete only this URL's entry instead of the whole bucket.
    #[serde(default)]
    pub url: Option<String>,
}

/// Output from the cache_delete tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheDeleteOutput {
    pub bucket: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// False if nothing matched.
    pub deleted: bool,
}

/// Implementation of the cache_delete tool.
pub async fn delete_impl(proxy: &CacheProxy, params: CacheDeleteParams) -> Result<CallToolResult, McpError> {
    if params.bucket.trim().is_empty() {
        return Err(Error::InvalidInput("bucket cannot be empty".to_string()).into());
    }

    if let Some(url) = params.url {
        let url = proxy.settings().resolve_url(&url)?;
        let deleted = proxy
            .cache()
            .delete_entry(&params.bucket, &CacheRequest::get(url.as_str()))
            .await?;
        return Ok(json_result(&CacheDeleteOutput { bucket: params.bucket, url: Some(url.to_string()), deleted })?);
    }

    let deleted = proxy.cache().delete_bucket(&params.bucket).await?;
    if deleted && params.bucket == proxy.settings().cache_name {
        tracing::warn!(bucket = %params.bucket, "deleted the current cache; offline fallback unavailable until reinstall");
    }

    Ok(json_result(&CacheDeleteOutput { bucket: params.bucket, url: None, deleted })?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{offline_proxy, output};
    use portal_core::{ResponseType, StoredResponse};

    #[tokio::test]
    async fn test_delete_existing_bucket() {
        let (proxy, _) = offline_proxy().await;
        proxy.cache().open_bucket("v3").await.unwrap();

        let result = delete_impl(&proxy, CacheDeleteParams { bucket: "v3".to_string(), url: None })
            .await
            .unwrap();

        let out: CacheDeleteOutput = output(&result);
        assert!(out.deleted);
        assert!(!proxy.cache().has_bucket("v3").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_missing_bucket() {
        let (proxy, _) = offline_proxy().await;

        let result = delete_impl(&proxy, CacheDeleteParams { bucket: "v1".to_string(), url: None })
            .await
            .unwrap();

        let out: CacheDeleteOutput = output(&result);
        assert!(!out.deleted);
    }

    #[tokio::test]
    async fn test_delete_single_entry() {
        let (proxy, _) = offline_proxy().await;
        let url = "http://127.0.0.1:1/app/index.tsx";
        let stored = StoredResponse {
            url: url.to_string(),
            status: 200,
            status_text: "OK".to_string(),
            response_type: ResponseType::Basic,
            headers: Vec::new(),
            body: b"export {}".to_vec(),
        };
        proxy
            .cache()
            .put_entry("v4", &CacheRequest::get(url), &stored)
            .await
            .unwrap();

        let params = CacheDeleteParams { bucket: "v4".to_string(), url: Some("./index.tsx".to_string()) };
        let out: CacheDeleteOutput = output(&delete_impl(&proxy, params).await.unwrap());

        assert!(out.deleted);
        assert_eq!(out.url.as_deref(), Some(url));
        assert!(proxy.cache().has_bucket("v4").await.unwrap());
        assert!(proxy.cache().list_entries("v4").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_empty_name() {
        let (proxy, _) = offline_proxy().await;
        let result = delete_impl(&proxy, CacheDeleteParams { bucket: " ".to_string(), url: None }).await;
        assert!(result.is_err());
    }
}
