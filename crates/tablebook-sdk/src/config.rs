//! Client configuration.

use std::time::Duration;

use thiserror::Error;

/// Environment variable holding the authority base URL.
pub const BASE_URL_VAR: &str = "TABLEBOOK_BASE_URL";

/// Environment variable holding an optional request timeout in seconds.
pub const TIMEOUT_VAR: &str = "TABLEBOOK_TIMEOUT_SECS";

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:4000/api";

/// Configuration problems detected before any request is made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The base URL cannot carry endpoint paths.
    #[error("Invalid base URL {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// The timeout is not a positive number of seconds.
    #[error("Invalid timeout {value:?}: expected a positive number of seconds")]
    InvalidTimeout { value: String },

    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Client(String),
}

/// Configuration for talking to the booking authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Authority base URL, including any path prefix (e.g. `https://host/api`).
    pub base_url: String,

    /// Per-request timeout. `None` means requests may wait indefinitely.
    pub timeout: Option<Duration>,

    /// User-Agent header sent with every request.
    pub user_agent: String,
}

impl ClientConfig {
    /// Create a configuration for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: None,
            user_agent: format!("tablebook/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Set a per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the User-Agent header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = lookup(BASE_URL_VAR)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let mut config = Self::new(base_url);

        if let Some(raw) = lookup(TIMEOUT_VAR).filter(|v| !v.trim().is_empty()) {
            config = config.with_timeout(parse_timeout_secs(&raw)?);
        }

        Ok(config)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// Parse a positive whole number of seconds.
pub fn parse_timeout_secs(raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidTimeout {
            value: raw.to_string(),
        }),
    }
}
