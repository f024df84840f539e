//! Configuration for the sync queue and worker

use crate::error::{PimSyncError, Result};
use crate::retry::RetryPolicy;
use crate::utils::get_env_with_prefix;
use serde::{Deserialize, Serialize};

/// Queue backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueBackend {
    /// In-memory queue (for development/testing)
    Memory,
    /// Redis-backed queue (for production)
    #[cfg(feature = "queue-redis")]
    Redis,
}

impl Default for QueueBackend {
    fn default() -> Self {
        Self::Memory
    }
}

/// Configuration for the PIM sync subsystem
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    /// Enable the sync worker; when false the worker exits at startup
    /// without entering the loop
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Queue backend type
    #[serde(default)]
    pub backend: QueueBackend,

    /// Redis connection URL (only used for the Redis backend)
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Sleep duration when the pending lane is empty
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Pause after a queue-level error before the loop resumes
    #[serde(default = "default_error_cooldown_ms")]
    pub error_cooldown_ms: u64,

    /// Attempts threshold before a failing job is dead-lettered
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Exponent base for the retry backoff (delay = base ^ attempts seconds)
    #[serde(default = "default_backoff_base_seconds")]
    pub backoff_base_seconds: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            backend: QueueBackend::default(),
            redis_url: None,
            poll_interval_ms: default_poll_interval_ms(),
            error_cooldown_ms: default_error_cooldown_ms(),
            max_retries: default_max_retries(),
            backoff_base_seconds: default_backoff_base_seconds(),
        }
    }
}

impl SyncConfig {
    /// Load sync configuration from environment variables
    ///
    /// A malformed value is a fatal startup error; it is never silently
    /// replaced with a default.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(enabled) = parse_env("SYNC_ENABLED")? {
            config.enabled = enabled;
        }

        if let Some(backend) = get_env_with_prefix("SYNC_BACKEND") {
            config.backend = match backend.to_lowercase().as_str() {
                "memory" => QueueBackend::Memory,
                #[cfg(feature = "queue-redis")]
                "redis" => QueueBackend::Redis,
                other => {
                    return Err(PimSyncError::configuration(format!(
                        "Unknown SYNC_BACKEND value: {}",
                        other
                    )))
                }
            };
        }

        if let Some(url) = get_env_with_prefix("SYNC_REDIS_URL") {
            config.redis_url = Some(url);
        }

        if let Some(interval) = parse_env("SYNC_POLL_INTERVAL_MS")? {
            config.poll_interval_ms = interval;
        }

        if let Some(cooldown) = parse_env("SYNC_ERROR_COOLDOWN_MS")? {
            config.error_cooldown_ms = cooldown;
        }

        if let Some(retries) = parse_env("SYNC_MAX_RETRIES")? {
            config.max_retries = retries;
        }

        if let Some(base) = parse_env("SYNC_BACKOFF_BASE_SECONDS")? {
            config.backoff_base_seconds = base;
        }

        Ok(config)
    }

    /// Build the retry policy described by this configuration
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.backoff_base_seconds)
    }
}

/// Read and parse one environment value, mapping a parse failure to a
/// configuration error naming the offending variable
fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match get_env_with_prefix(key) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| PimSyncError::configuration(format!("Invalid {} value: {}", key, raw))),
        None => Ok(None),
    }
}

fn default_enabled() -> bool {
    false
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_error_cooldown_ms() -> u64 {
    5000
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_base_seconds() -> u64 {
    2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.backend, QueueBackend::Memory);
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.backoff_base_seconds, 2);
    }

    #[test]
    fn test_retry_policy_from_config() {
        let config = SyncConfig {
            max_retries: 5,
            backoff_base_seconds: 3,
            ..SyncConfig::default()
        };
        let policy = config.retry_policy();
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.backoff_base_seconds, 3);
    }

    // Single test so the env mutations never race each other
    #[test]
    fn test_from_env() {
        std::env::set_var("PIMSYNC_SYNC_ENABLED", "true");
        std::env::set_var("PIMSYNC_SYNC_MAX_RETRIES", "7");
        std::env::set_var("PIMSYNC_SYNC_POLL_INTERVAL_MS", "250");

        let config = SyncConfig::from_env().unwrap();
        assert!(config.enabled);
        assert_eq!(config.max_retries, 7);
        assert_eq!(config.poll_interval_ms, 250);

        // Malformed numeric values fail startup instead of falling back to
        // defaults
        std::env::set_var("PIMSYNC_SYNC_MAX_RETRIES", "lots");
        let err = SyncConfig::from_env().unwrap_err();
        assert!(matches!(err, PimSyncError::Configuration(_)));
        assert!(err.to_string().contains("SYNC_MAX_RETRIES"));

        std::env::set_var("PIMSYNC_SYNC_MAX_RETRIES", "7");
        std::env::set_var("PIMSYNC_SYNC_BACKEND", "kafka");
        let err = SyncConfig::from_env().unwrap_err();
        assert!(matches!(err, PimSyncError::Configuration(_)));
        assert!(err.to_string().contains("SYNC_BACKEND"));

        std::env::remove_var("PIMSYNC_SYNC_ENABLED");
        std::env::remove_var("PIMSYNC_SYNC_MAX_RETRIES");
        std::env::remove_var("PIMSYNC_SYNC_POLL_INTERVAL_MS");
        std::env::remove_var("PIMSYNC_SYNC_BACKEND");
    }
}
