// src/config/mod.rs
//! Engine configuration

pub mod constants;
pub mod loader;

pub use constants::*;
pub use loader::{ConfigError, ConfigLoader};

use crate::hal::serial_driver::SerialConfig;
use crate::hal::synthetic::SyntheticConfig;
use crate::logger::LogLevel;
use serde::{Deserialize, Serialize};

/// Complete engine configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EngineConfig {
    /// Seconds of data a default-sized buffer retains
    #[serde(default = "defaults::retention_secs")]
    pub retention_secs: u32,

    #[serde(default = "defaults::max_buffer_samples")]
    pub max_buffer_samples: usize,

    /// Failed reads or decodes in a row before the loop gives up
    #[serde(default = "defaults::max_consecutive_failures")]
    pub max_consecutive_failures: u32,

    #[serde(default = "defaults::read_timeout_ms")]
    pub read_timeout_ms: u64,

    #[serde(default = "defaults::stop_timeout_ms")]
    pub stop_timeout_ms: u64,

    #[serde(default = "defaults::log_level")]
    pub log_level: LogLevel,

    #[serde(default)]
    pub serial: SerialConfig,

    #[serde(default)]
    pub synthetic: SyntheticConfig,
}

/// Default value providers using constants
mod defaults {
    use crate::config::constants::*;
    use crate::logger::LogLevel;

    pub fn retention_secs() -> u32 { buffer::DEFAULT_RETENTION_SECS }
    pub fn max_buffer_samples() -> usize { buffer::DEFAULT_MAX_BUFFER_SAMPLES }
    pub fn max_consecutive_failures() -> u32 { session::DEFAULT_MAX_CONSECUTIVE_FAILURES }
    pub fn read_timeout_ms() -> u64 { session::DEFAULT_READ_TIMEOUT_MS }
    pub fn stop_timeout_ms() -> u64 { session::DEFAULT_STOP_TIMEOUT_MS }
    pub fn log_level() -> LogLevel { LogLevel::Info }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retention_secs: defaults::retention_secs(),
            max_buffer_samples: defaults::max_buffer_samples(),
            max_consecutive_failures: defaults::max_consecutive_failures(),
            read_timeout_ms: defaults::read_timeout_ms(),
            stop_timeout_ms: defaults::stop_timeout_ms(),
            log_level: defaults::log_level(),
            serial: SerialConfig::default(),
            synthetic: SyntheticConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Validate ranges and cross-field consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retention_secs == 0 {
            return Err(invalid("retention_secs", "must be greater than 0"));
        }
        if self.max_buffer_samples == 0 {
            return Err(invalid("max_buffer_samples", "must be greater than 0"));
        }
        if self.max_consecutive_failures == 0 {
            return Err(invalid("max_consecutive_failures", "must be greater than 0"));
        }
        if self.read_timeout_ms == 0 || self.read_timeout_ms > session::MAX_READ_TIMEOUT_MS {
            return Err(invalid(
                "read_timeout_ms",
                format!("must be between 1 and {}", session::MAX_READ_TIMEOUT_MS),
            ));
        }
        // the loop can be blocked in a read for a full read timeout
        if self.stop_timeout_ms < self.read_timeout_ms {
            return Err(invalid(
                "stop_timeout_ms",
                format!("must be at least read_timeout_ms ({})", self.read_timeout_ms),
            ));
        }
        self.serial.validate().map_err(|reason| invalid("serial", reason))?;
        self.synthetic.validate().map_err(|reason| invalid("synthetic", reason))?;
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retention_secs, 3600);
        assert_eq!(config.max_buffer_samples, 50_000_000);
        assert_eq!(config.max_consecutive_failures, 50);
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            retention_secs = 60
            log_level = "debug"

            [serial]
            baud_rate = 230400
            "#,
        )
        .unwrap();

        assert_eq!(config.retention_secs, 60);
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.serial.baud_rate, 230_400);
        assert_eq!(config.serial.timeout_ms, SerialConfig::default().timeout_ms);
        assert_eq!(config.read_timeout_ms, 1000);
        assert_eq!(config.synthetic, SyntheticConfig::default());
    }

    #[test]
    fn test_validation_failures() {
        let cases: Vec<(&str, EngineConfig)> = vec![
            ("retention_secs", EngineConfig { retention_secs: 0, ..Default::default() }),
            ("max_buffer_samples", EngineConfig { max_buffer_samples: 0, ..Default::default() }),
            ("read_timeout_ms", EngineConfig { read_timeout_ms: 0, ..Default::default() }),
            ("stop_timeout_ms", EngineConfig { stop_timeout_ms: 10, ..Default::default() }),
            (
                "synthetic",
                EngineConfig {
                    synthetic: SyntheticConfig { noise_level: 2.0, ..Default::default() },
                    ..Default::default()
                },
            ),
        ];

        for (expected, config) in cases {
            match config.validate() {
                Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, expected),
                other => panic!("expected {expected} to be rejected, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_toml_round_trip_keeps_values() {
        let config = EngineConfig {
            retention_secs: 10,
            log_level: LogLevel::Warn,
            ..Default::default()
        };
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: EngineConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
