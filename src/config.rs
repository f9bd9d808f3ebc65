//! Configuration management for Turnstile.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::error::{Result, TurnstileError};

/// Configuration for a [`RateLimiter`](crate::limiter::RateLimiter).
///
/// All fields have defaults, so a config embedded in a larger service
/// configuration file can be left partially (or entirely) unspecified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Maximum number of requests admitted per key within one window
    #[serde(default = "default_limit")]
    pub limit: u64,

    /// Lockout duration in seconds once the limit is exceeded
    #[serde(default = "default_block_time_secs")]
    pub block_time_secs: u64,

    /// Window length in seconds, i.e. how long a key's counter lives
    /// after its first increment before it expires and resets
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            block_time_secs: default_block_time_secs(),
            window_secs: default_window_secs(),
        }
    }
}

fn default_limit() -> u64 {
    10
}

fn default_block_time_secs() -> u64 {
    60
}

fn default_window_secs() -> u64 {
    60
}

impl LimiterConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading limiter configuration");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| TurnstileError::Config(format!("Failed to parse limiter config: {}", e)))
    }

    /// Check that the configuration describes a usable limiter.
    ///
    /// A limit of zero would deny every request before it is counted.
    pub fn validate(&self) -> Result<()> {
        if self.limit == 0 {
            return Err(TurnstileError::Config(
                "limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Lockout duration applied when a key exceeds its limit.
    pub fn block_time(&self) -> Duration {
        Duration::from_secs(self.block_time_secs)
    }

    /// Lifetime of a key's counter, armed on its first increment.
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LimiterConfig::default();

        assert_eq!(config.limit, 10);
        assert_eq!(config.block_time_secs, 60);
        assert_eq!(config.window_secs, 60);
    }

    #[test]
    fn test_duration_accessors() {
        let config = LimiterConfig {
            limit: 5,
            block_time_secs: 120,
            window_secs: 30,
        };

        assert_eq!(config.block_time(), Duration::from_secs(120));
        assert_eq!(config.window(), Duration::from_secs(30));
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
limit: 100
block_time_secs: 300
window_secs: 60
"#;
        let config = LimiterConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.limit, 100);
        assert_eq!(config.block_time_secs, 300);
        assert_eq!(config.window_secs, 60);
    }

    #[test]
    fn test_from_yaml_partial_uses_defaults() {
        let config = LimiterConfig::from_yaml("limit: 3").unwrap();

        assert_eq!(config.limit, 3);
        assert_eq!(config.block_time_secs, 60);
        assert_eq!(config.window_secs, 60);
    }

    #[test]
    fn test_from_yaml_invalid() {
        let result = LimiterConfig::from_yaml("limit: [not, a, number]");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_zero_limit() {
        let config = LimiterConfig {
            limit: 0,
            ..LimiterConfig::default()
        };

        assert!(config.validate().is_err());
        assert!(LimiterConfig::default().validate().is_ok());
    }
}
