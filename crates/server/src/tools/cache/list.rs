//! cache_list tool implementation.
//!
//! Lists buckets, and optionally the entries of one bucket.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;
use portal_client::CacheProxy;
use portal_core::{EntrySummary, Error};

/// Parameters for the cache_list tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheListParams {
    /// Also list the entries of this bucket.
    #[serde(default)]
    pub bucket: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BucketView {
    pub name: String,
    /// Whether this is the current cache version.
    pub current: bool,
}

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListOutput {
    pub current: String,
    pub buckets: Vec<BucketView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<Vec<EntrySummary>>,
}

/// Implementation of the cache_list tool.
pub async fn list_impl(proxy: &CacheProxy, params: CacheListParams) -> Result<CallToolResult, McpError> {
    let current = proxy.settings().cache_name.clone();
    let buckets = proxy
        .cache()
        .bucket_names()
        .await?
        .into_iter()
        .map(|name| BucketView { current: name == current, name })
        .collect::<Vec<_>>();

    let entries = match params.bucket {
        Some(bucket) => {
            if !proxy.cache().has_bucket(&bucket).await? {
                return Err(Error::CacheMiss(format!("no bucket named {bucket}")).into());
            }
            Some(proxy.cache().list_entries(&bucket).await?)
        }
        None => None,
    };

    Ok(json_result(&CacheListOutput { current, buckets, entries })?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{offline_proxy, output};

    #[tokio::test]
    async fn test_list_marks_current_bucket() {
        let (proxy, _) = offline_proxy().await;
        proxy.cache().open_bucket("v3").await.unwrap();
        proxy.cache().open_bucket("v4").await.unwrap();

        let result = list_impl(&proxy, CacheListParams::default()).await.unwrap();
        let out: CacheListOutput = output(&result);

        assert_eq!(out.current, "v4");
        assert_eq!(out.buckets.len(), 2);
        assert!(!out.buckets[0].current);
        assert!(out.buckets[1].current);
        assert!(out.entries.is_none());
    }

    #[tokio::test]
    async fn test_list_entries_of_bucket() {
        let (proxy, _) = offline_proxy().await;
        proxy.cache().open_bucket("v4").await.unwrap();

        let params = CacheListParams { bucket: Some("v4".to_string()) };
        let result = list_impl(&proxy, params).await.unwrap();
        let out: CacheListOutput = output(&result);

        assert_eq!(out.entries.map(|e| e.len()), Some(0));
    }

    #[tokio::test]
    async fn test_list_unknown_bucket() {
        let (proxy, _) = offline_proxy().await;
        let params = CacheListParams { bucket: Some("v9".to_string()) };
        assert!(list_impl(&proxy, params).await.is_err());
    }
}
