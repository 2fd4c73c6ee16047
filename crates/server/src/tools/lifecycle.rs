//! proxy_install and proxy_activate tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;
use portal_client::{ActivateReport, CacheProxy, InstallReport};

/// Output from the proxy_install tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProxyInstallOutput {
    pub install: InstallReport,
    /// Present when the install asked to skip waiting and activation ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activate: Option<ActivateReport>,
}

/// Output from the proxy_activate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProxyActivateOutput {
    pub activate: ActivateReport,
}

/// Implementation of the proxy_install tool.
///
/// A failed install leaves every bucket untouched and no activation runs.
pub async fn install_impl(proxy: &CacheProxy) -> Result<CallToolResult, McpError> {
    let install = proxy.install().await?;
    let activate = if install.skip_waiting { Some(proxy.activate().await?) } else { None };

    Ok(json_result(&ProxyInstallOutput { install, activate })?)
}

/// Implementation of the proxy_activate tool.
pub async fn activate_impl(proxy: &CacheProxy) -> Result<CallToolResult, McpError> {
    let activate = proxy.activate().await?;
    Ok(json_result(&ProxyActivateOutput { activate })?)
}
