//! SDK configuration
//!
//! Configuration is an explicit value threaded into every observer and
//! emitter at construction; there is no implicit mutable global. The
//! optional process-wide default observer lives in [`crate::observer`]
//! and is installed and cleared explicitly.

use std::fmt;
use std::time::Duration;

/// Default collector endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000";

/// Default delivery timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Environment variable for the collector endpoint
const ENV_ENDPOINT: &str = "TOKENLENS_ENDPOINT";

/// Environment variable for the collector API key
const ENV_API_KEY: &str = "TOKENLENS_API_KEY";

/// Environment variable for the enabled flag
const ENV_ENABLED: &str = "TOKENLENS_ENABLED";

/// Environment variable for the delivery timeout (seconds)
const ENV_TIMEOUT_SECS: &str = "TOKENLENS_TIMEOUT_SECS";

/// Observer configuration
#[derive(Clone)]
pub struct ObserverConfig {
    /// Collector base URL (events are POSTed to `{endpoint}/events`)
    pub endpoint: String,
    /// Bearer token sent with each delivery, if configured
    pub api_key: Option<String>,
    /// Master switch: when false every tracking call is a no-op
    pub enabled: bool,
    /// Upper bound on how long one delivery may block
    pub timeout: Duration,
}

// Custom Debug implementation to mask the API key
impl fmt::Debug for ObserverConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_deref().map(mask_api_key))
            .field("enabled", &self.enabled)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Mask an API key for safe display
fn mask_api_key(key: &str) -> String {
    if key.len() <= 8 {
        return "****".to_string();
    }
    format!("{}...{}", &key[..4], &key[key.len() - 4..])
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            enabled: true,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ObserverConfig {
    /// Create a configuration for the given collector endpoint.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset. Never fails: instrumentation must
    /// come up even in an unconfigured process.
    #[must_use]
    pub fn from_env() -> Self {
        let endpoint =
            std::env::var(ENV_ENDPOINT).unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        let api_key = std::env::var(ENV_API_KEY).ok().filter(|k| !k.is_empty());
        let enabled = std::env::var(ENV_ENABLED)
            .map(|v| !matches!(v.to_lowercase().as_str(), "false" | "0"))
            .unwrap_or(true);
        let timeout = std::env::var(ENV_TIMEOUT_SECS)
            .ok()
            .and_then(|v| v.parse().ok())
            .map_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS), Duration::from_secs);

        Self {
            endpoint,
            api_key,
            enabled,
            timeout,
        }
    }

    /// Set the API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Enable or disable tracking.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the delivery timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ObserverConfig::default();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert!(config.api_key.is_none());
        assert!(config.enabled);
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_builder() {
        let config = ObserverConfig::new("http://collector:9000")
            .with_api_key("tk-1234567890abcdef")
            .with_enabled(false)
            .with_timeout(Duration::from_secs(1));
        assert_eq!(config.endpoint, "http://collector:9000");
        assert_eq!(config.api_key.as_deref(), Some("tk-1234567890abcdef"));
        assert!(!config.enabled);
        assert_eq!(config.timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_debug_masks_api_key() {
        let config = ObserverConfig::default().with_api_key("tk-1234567890abcdef");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("1234567890"));
        assert!(rendered.contains("tk-1"));
    }
}
