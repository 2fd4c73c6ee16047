//! Checks applied to a loaded [`AppConfig`].

use std::ops::RangeInclusive;

use crate::config::AppConfig;
use thiserror::Error;

const MAX_BYTES: RangeInclusive<usize> = 1..=100 * 1024 * 1024;
const TIMEOUT_MS: RangeInclusive<u64> = 100..=300_000;
const MAX_REDIRECTS: RangeInclusive<usize> = 0..=50;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::Invalid { field: field.to_string(), reason: reason.into() }
    }
}

impl AppConfig {
    /// Reject values the proxy cannot run with.
    ///
    /// A scope whose path lacks a trailing `/` is accepted with a warning,
    /// since `./index.html` then resolves against the scope's parent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !MAX_BYTES.contains(&self.max_bytes) {
            return Err(ConfigError::invalid("max_bytes", "must be between 1 byte and 100MB"));
        }
        if !TIMEOUT_MS.contains(&self.timeout_ms) {
            return Err(ConfigError::invalid("timeout_ms", "must be between 100ms and 5 minutes"));
        }
        if !MAX_REDIRECTS.contains(&self.max_redirects) {
            return Err(ConfigError::invalid("max_redirects", "must not exceed 50"));
        }
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::invalid("user_agent", "must not be empty"));
        }
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::invalid("db_path", "must not be empty"));
        }

        let scope = self.scope()?;
        if !scope.path().ends_with('/') {
            tracing::warn!(scope_url = %scope, "scope path has no trailing '/'");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn rejected_field(config: AppConfig) -> String {
        match config.validate() {
            Err(ConfigError::Invalid { field, .. }) => field,
            other => panic!("expected an invalid field, got {other:?}"),
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_limits_at_bounds_are_valid() {
        let config = AppConfig { max_bytes: 1, timeout_ms: 100, max_redirects: 0, ..Default::default() };
        assert!(config.validate().is_ok());

        let config = AppConfig { max_bytes: 100 * 1024 * 1024, timeout_ms: 300_000, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_out_of_range_limits() {
        assert_eq!(rejected_field(AppConfig { max_bytes: 0, ..Default::default() }), "max_bytes");
        assert_eq!(rejected_field(AppConfig { max_bytes: 101 * 1024 * 1024, ..Default::default() }), "max_bytes");
        assert_eq!(rejected_field(AppConfig { timeout_ms: 99, ..Default::default() }), "timeout_ms");
        assert_eq!(rejected_field(AppConfig { timeout_ms: 300_001, ..Default::default() }), "timeout_ms");
        assert_eq!(rejected_field(AppConfig { max_redirects: 51, ..Default::default() }), "max_redirects");
    }

    #[test]
    fn test_empty_strings() {
        assert_eq!(rejected_field(AppConfig { user_agent: "  ".into(), ..Default::default() }), "user_agent");
        assert_eq!(rejected_field(AppConfig { db_path: PathBuf::new(), ..Default::default() }), "db_path");
    }

    #[test]
    fn test_scope_must_be_http() {
        assert_eq!(rejected_field(AppConfig { scope_url: "not a url".into(), ..Default::default() }), "scope_url");
        assert_eq!(rejected_field(AppConfig { scope_url: "ftp://portal.test/".into(), ..Default::default() }), "scope_url");
    }

    #[test]
    fn test_scope_without_trailing_slash_is_accepted() {
        let config = AppConfig { scope_url: "https://portal.test/app".into(), ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
