//! Configuration structures for the API client layer
//!
//! Only `base_url` is resolved from the deployment environment; every other
//! field carries the protocol default from [`crate::constants`] and is only
//! overridden programmatically (or from a config file during development).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::{
    BASE_DELAY_MS, CSRF_HEADER, CSRF_TTL_SECS, DEFAULT_CSRF_PATH, DEFAULT_LOGOUT_PATH,
    DEFAULT_RATE_LIMIT_SECS, DEFAULT_REFRESH_PATH, DEFAULT_TIMEOUT_MS, DEFAULT_USER_AGENT,
    MAX_RETRIES,
};
use crate::errors::{LugnError, Result};
use crate::types::Locale;

/// Configuration for the resilient API client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Backend base URL (e.g. "https://api.lugn.app")
    pub base_url: String,
    /// Transport timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Retry ceiling for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Linear backoff unit in milliseconds
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Lifetime of a cached CSRF token in seconds
    #[serde(default = "default_csrf_ttl_secs")]
    pub csrf_ttl_secs: u64,
    /// Header carrying the CSRF token
    #[serde(default = "default_csrf_header")]
    pub csrf_header: String,
    /// CSRF issuance endpoint
    #[serde(default = "default_csrf_path")]
    pub csrf_path: String,
    /// Credential refresh endpoint
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
    /// Logout endpoint
    #[serde(default = "default_logout_path")]
    pub logout_path: String,
    /// Wait applied to 429 responses without a usable `retry-after`
    #[serde(default = "default_rate_limit_secs")]
    pub rate_limit_default_secs: u64,
    /// Language of user-facing messages
    #[serde(default)]
    pub locale: Locale,
    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl ApiConfig {
    /// Create a configuration with protocol defaults for the given base URL
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_retries: MAX_RETRIES,
            base_delay_ms: BASE_DELAY_MS,
            csrf_ttl_secs: CSRF_TTL_SECS,
            csrf_header: CSRF_HEADER.to_string(),
            csrf_path: DEFAULT_CSRF_PATH.to_string(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            logout_path: DEFAULT_LOGOUT_PATH.to_string(),
            rate_limit_default_secs: DEFAULT_RATE_LIMIT_SECS,
            locale: Locale::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Transport timeout as a [`Duration`]
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Backoff unit as a [`Duration`]
    #[must_use]
    pub const fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// CSRF token lifetime as a [`Duration`]
    #[must_use]
    pub const fn csrf_ttl(&self) -> Duration {
        Duration::from_secs(self.csrf_ttl_secs)
    }

    /// Parse the base URL
    ///
    /// # Errors
    /// Returns `LugnError::Config` if the base URL is malformed, is not
    /// http(s), or has no host.
    pub fn base(&self) -> Result<Url> {
        let raw = self.base_url.trim();
        if raw.is_empty() {
            return Err(LugnError::Config("base_url must not be empty".to_string()));
        }
        let url = Url::parse(raw)
            .map_err(|e| LugnError::Config(format!("invalid base_url '{raw}': {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(LugnError::Config(format!(
                "base_url must use http or https, got '{raw}'"
            )));
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(LugnError::Config(format!("base_url has no host: '{raw}'")));
        }
        Ok(url)
    }

    /// Resolve an endpoint path against the base URL
    ///
    /// Absolute http(s) URLs are returned unchanged. Relative endpoints are
    /// appended to the base path, so a base of `https://host/v1` resolves
    /// `/journal` to `https://host/v1/journal`.
    ///
    /// # Errors
    /// Returns `LugnError::Config` if the base URL is invalid or the endpoint
    /// cannot be joined onto it.
    pub fn resolve(&self, endpoint: &str) -> Result<String> {
        if let Ok(absolute) = Url::parse(endpoint) {
            if matches!(absolute.scheme(), "http" | "https") {
                return Ok(absolute.into());
            }
        }

        let mut base = self.base()?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let joined = base
            .join(endpoint.trim_start_matches('/'))
            .map_err(|e| LugnError::Config(format!("invalid endpoint '{endpoint}': {e}")))?;
        Ok(joined.into())
    }

    /// Validate the configuration
    ///
    /// # Errors
    /// Returns `LugnError::Config` if the base URL does not parse as an
    /// http(s) URL with a host, or if the timeout or CSRF header is empty.
    pub fn validate(&self) -> Result<()> {
        self.base()?;
        if self.timeout_ms == 0 {
            return Err(LugnError::Config("timeout_ms must be greater than zero".to_string()));
        }
        if self.csrf_header.trim().is_empty() {
            return Err(LugnError::Config("csrf_header must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), json: false }
    }
}

const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

const fn default_max_retries() -> u32 {
    MAX_RETRIES
}

const fn default_base_delay_ms() -> u64 {
    BASE_DELAY_MS
}

const fn default_csrf_ttl_secs() -> u64 {
    CSRF_TTL_SECS
}

const fn default_rate_limit_secs() -> u64 {
    DEFAULT_RATE_LIMIT_SECS
}

fn default_csrf_header() -> String {
    CSRF_HEADER.to_string()
}

fn default_csrf_path() -> String {
    DEFAULT_CSRF_PATH.to_string()
}

fn default_refresh_path() -> String {
    DEFAULT_REFRESH_PATH.to_string()
}

fn default_logout_path() -> String {
    DEFAULT_LOGOUT_PATH.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}
