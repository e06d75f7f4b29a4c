//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use serde::Deserialize;

use crate::error::ConfigError;

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
/// Every section is optional; a missing file yields the defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Rate limiting settings.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limit.cooldown_minutes == 0 {
            return Err(ConfigError::ValidationError {
                message: "rate_limit.cooldown_minutes must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Rate limiting configuration.
///
/// The cooldown mirrors the X API free-tier window: after every successful
/// call an endpoint group is considered spent for the whole window. The
/// window length is a policy assumption about the remote quota, not a value
/// the remote reports, which is why it is configurable.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Minutes an endpoint group stays unusable after a successful call or
    /// a remote 429. Default: 15 (the X API free-tier window).
    #[serde(default = "default_cooldown_minutes")]
    pub cooldown_minutes: u64,

    /// Extra seconds added on top of a group's reset instant before a
    /// deferred call proceeds. Default: 1.
    #[serde(default = "default_wait_buffer_seconds")]
    pub wait_buffer_seconds: u64,
}

impl RateLimitConfig {
    /// Cooldown window as a [`std::time::Duration`].
    #[must_use]
    pub const fn cooldown(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.cooldown_minutes * 60)
    }

    /// Wait buffer as a [`std::time::Duration`].
    #[must_use]
    pub const fn wait_buffer(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.wait_buffer_seconds)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            cooldown_minutes: default_cooldown_minutes(),
            wait_buffer_seconds: default_wait_buffer_seconds(),
        }
    }
}

const fn default_cooldown_minutes() -> u64 {
    15
}

const fn default_wait_buffer_seconds() -> u64 {
    1
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let json = r"{}";
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_full_config() {
        let json = r#"{
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "_comment": "Test config",
            "rate_limit": {
                "cooldown_minutes": 5,
                "wait_buffer_seconds": 2
            },
            "logging": {
                "level": "debug"
            }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.rate_limit.cooldown_minutes, 5);
        assert_eq!(config.rate_limit.wait_buffer_seconds, 2);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn rate_limit_config_defaults() {
        let config = RateLimitConfig::default();
        assert_eq!(config.cooldown_minutes, 15);
        assert_eq!(config.wait_buffer_seconds, 1);
        assert_eq!(config.cooldown(), std::time::Duration::from_secs(900));
        assert_eq!(config.wait_buffer(), std::time::Duration::from_secs(1));
    }

    #[test]
    fn logging_config_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "warn");
    }

    #[test]
    fn reject_zero_cooldown() {
        let json = r#"{
            "rate_limit": {
                "cooldown_minutes": 0
            }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_unknown_fields() {
        let json = r#"{
            "unknown_field": "value"
        }"#;

        let result: Result<Config, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
