//! Runtime settings for the proxy binary.
//!
//! Sources, highest precedence first:
//!
//! 1. `PORTAL_PROXY_*` environment variables (`PORTAL_PROXY_TIMEOUT_MS=5000`)
//! 2. the TOML file named by `PORTAL_PROXY_CONFIG_FILE`, when set
//! 3. [`AppConfig::default`]
//!
//! Only transport and storage knobs live here. The cache version, offline
//! URL and asset manifest are fixed in [`crate::manifest`].

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

mod validation;

pub use validation::ConfigError;

const ENV_PREFIX: &str = "PORTAL_PROXY_";
const CONFIG_FILE_VAR: &str = "PORTAL_PROXY_CONFIG_FILE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite file holding every cache bucket.
    pub db_path: PathBuf,

    /// Origin and base path of the proxied app.
    ///
    /// Relative manifest entries resolve against it, and responses whose
    /// final URL shares its origin are `basic`.
    pub scope_url: String,

    pub user_agent: String,

    /// Largest response body accepted from the network.
    pub max_bytes: usize,

    /// Per-request network timeout.
    pub timeout_ms: u64,

    pub max_redirects: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./portal-proxy-cache.sqlite"),
            scope_url: "http://localhost:5173/".into(),
            user_agent: concat!("portal-proxy/", env!("CARGO_PKG_VERSION_MAJOR"), ".", env!("CARGO_PKG_VERSION_MINOR"))
                .into(),
            max_bytes: 10 * 1024 * 1024,
            timeout_ms: 20_000,
            max_redirects: 20,
        }
    }
}

impl AppConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The scope as an http(s) URL.
    pub fn scope(&self) -> Result<Url, ConfigError> {
        let scope = Url::parse(&self.scope_url).map_err(|e| ConfigError::invalid("scope_url", e.to_string()))?;
        match scope.scheme() {
            "http" | "https" => Ok(scope),
            other => Err(ConfigError::invalid("scope_url", format!("unsupported scheme {other}"))),
        }
    }

    /// Load and validate configuration from every source.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(path) = std::env::var(CONFIG_FILE_VAR) {
            tracing::debug!(path = %path, "reading config file");
            figment = figment.merge(Toml::file(path));
        }

        let config: Self = figment
            .merge(Env::prefixed(ENV_PREFIX).map(|key| key.as_str().to_lowercase().into()))
            .extract()
            .map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./portal-proxy-cache.sqlite"));
        assert_eq!(config.user_agent, "portal-proxy/0.1");
        assert_eq!(config.max_bytes, 10_485_760);
        assert_eq!(config.timeout(), Duration::from_secs(20));
        assert_eq!(config.max_redirects, 20);
    }

    #[test]
    fn test_scope() {
        let scope = AppConfig::default().scope().unwrap();
        assert_eq!(scope.host_str(), Some("localhost"));
        assert_eq!(scope.port(), Some(5173));

        let file = AppConfig { scope_url: "file:///srv/app/".into(), ..Default::default() };
        assert!(matches!(file.scope(), Err(ConfigError::Invalid { field, .. }) if field == "scope_url"));
    }

    #[test]
    fn test_load_without_sources_gives_defaults() {
        figment::Jail::expect_with(|_| {
            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config, AppConfig::default());
            Ok(())
        });
    }

    #[test]
    fn test_load_env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("portal.toml", "timeout_ms = 5000\nscope_url = \"https://portal.test/app/\"")?;
            jail.set_env("PORTAL_PROXY_CONFIG_FILE", "portal.toml");
            jail.set_env("PORTAL_PROXY_TIMEOUT_MS", "7000");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.timeout_ms, 7000);
            assert_eq!(config.scope_url, "https://portal.test/app/");
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("PORTAL_PROXY_MAX_BYTES", "0");
            assert!(matches!(AppConfig::load(), Err(ConfigError::Invalid { .. })));
            Ok(())
        });
    }
}
