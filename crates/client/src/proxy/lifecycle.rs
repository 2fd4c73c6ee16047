//! Install and activate events.

use futures_util::future::{join_all, try_join_all};
use serde::{Deserialize, Serialize};

use super::CacheProxy;
use crate::fetch::ProxyRequest;
use portal_core::Error;

/// Outcome of a successful install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct InstallReport {
    pub bucket: String,
    /// Whether the bucket did not exist before this install.
    pub created: bool,
    pub cached: usize,
    /// Activate immediately instead of waiting for old clients to close.
    pub skip_waiting: bool,
}

/// Outcome of an activation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ActivateReport {
    pub bucket: String,
    /// Stale buckets removed.
    pub deleted: Vec<String>,
    /// Stale buckets whose deletion failed; activation went ahead regardless.
    pub failed: Vec<String>,
    pub claimed_clients: usize,
}

impl CacheProxy {
    /// Populate the current bucket with the asset manifest.
    ///
    /// All assets are fetched before anything is written, so a single failed,
    /// non-2xx or unstorable asset leaves the bucket exactly as it was.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        let bucket = &self.settings.cache_name;
        let created = self.db.open_bucket(bucket).await?;

        tracing::info!(bucket = %bucket, assets = self.settings.assets.len(), "caching app shell and dependencies");

        let fetches = self.settings.assets.iter().map(|url| async move {
            let request = ProxyRequest::get(url.clone());
            let response = self
                .network
                .fetch(&request)
                .await
                .map_err(|e| Error::InstallFailed(format!("{url}: {e}")))?;

            if !response.is_ok() {
                return Err(Error::InstallFailed(format!("{url}: status {}", response.status)));
            }
            if response.status == 206 || response.varies_on_everything() {
                return Err(Error::InstallFailed(format!("{url}: response cannot be stored")));
            }

            Ok((request.to_cache_request(), response))
        });

        let entries = match try_join_all(fetches).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(bucket = %bucket, error = %e, "install failed; keeping previous version");
                return Err(e);
            }
        };

        let cached = self.db.put_batch(bucket, entries).await?;
        tracing::info!(bucket = %bucket, cached, "install complete");

        Ok(InstallReport { bucket: bucket.clone(), created, cached, skip_waiting: true })
    }

    /// Delete superseded buckets and take control of open clients.
    ///
    /// A failed deletion is logged and reported but does not abort
    /// activation; the bucket stays stale and is retried on the next one.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        let current = &self.settings.cache_name;
        let stale: Vec<String> = self
            .db
            .bucket_names()
            .await?
            .into_iter()
            .filter(|name| name != current)
            .collect();

        let deletions = stale.iter().map(|name| async move {
            tracing::info!(bucket = %name, "removing stale cache");
            (name, self.db.delete_bucket(name).await)
        });

        let mut report = ActivateReport { bucket: current.clone(), ..Default::default() };
        for (name, result) in join_all(deletions).await {
            match result {
                Ok(_) => report.deleted.push(name.clone()),
                Err(e) => {
                    tracing::warn!(bucket = %name, error = %e, "failed to remove stale cache");
                    report.failed.push(name.clone());
                }
            }
        }

        report.claimed_clients = self.clients.claim(current).await?;
        tracing::info!(
            bucket = %current,
            deleted = report.deleted.len(),
            claimed = report.claimed_clients,
            "activated"
        );

        Ok(report)
    }
}
