//! gtel Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! Minimal config should just work - only specify what you need to change.
//!
//! # Example Minimal Config
//!
//! ```toml
//! [sink.elasticsearch]
//! url = "http://localhost:9200"
//!
//! [[devices]]
//! name = "core1"
//! address = "10.0.0.1:57400"
//! username = "telemetry"
//! password_env = "GTEL_CORE1_PASSWORD"
//! paths = ["/interfaces/interface/state/counters"]
//! sample_interval = "30s"
//! ```
//!
//! See `configs/example.toml` for all available options.

mod batching;
mod devices;
mod error;
mod logging;
mod metrics;
mod sink;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use batching::BatchConfig;
pub use devices::DeviceConfig;
pub use error::{ConfigError, Result};
pub use logging::LogConfig;
pub use metrics::MetricsConfig;
pub use sink::{ElasticsearchConfig, SinkConfig};

use serde::Deserialize;

/// Main configuration structure
///
/// All sections except `devices` are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// Metrics reporting configuration
    pub metrics: MetricsConfig,

    /// Batching and backpressure limits
    pub batch: BatchConfig,

    /// Storage backend
    pub sink: SinkConfig,

    /// Devices to subscribe to (one pipeline each)
    pub devices: Vec<DeviceConfig>,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, contains invalid TOML, or
    /// fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Validate the configuration
    ///
    /// Checks for:
    /// - At least one device with non-empty name, address, and paths
    /// - Parseable paths, encoding, and subscription modes
    /// - A sample interval wherever sampling requires one
    /// - Positive batching limits
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[[devices]]
name = "core1"
address = "10.0.0.1:57400"
username = "telemetry"
password_env = "GTEL_CORE1_PASSWORD"
paths = ["/interfaces/interface/state/counters"]
sample_interval = "30s"
"#;

    #[test]
    fn test_minimal_config() {
        let config = Config::from_str(MINIMAL).unwrap();
        assert_eq!(config.devices.len(), 1);
        assert_eq!(config.devices[0].name, "core1");
        assert_eq!(config.log.level, "info");
        assert_eq!(config.batch.max_records, 1000);
        assert_eq!(config.sink.elasticsearch.url, "http://127.0.0.1:9200");
    }

    #[test]
    fn test_full_config() {
        let toml = r#"
[log]
level = "debug"

[metrics]
enabled = true
interval = "30s"

[batch]
max_records = 100
max_age = "5s"
in_flight_limit = 2

[sink.elasticsearch]
url = "http://es.internal:9200"
index_prefix = "lab"
retry_attempts = 3

[[devices]]
name = "core1"
address = "10.0.0.1:57400"
username = "telemetry"
password_env = "GTEL_PASSWORD"
paths = ["/interfaces/interface[name=Gi0/0/0]/state/counters"]
mode = "stream"
stream_mode = "sample"
sample_interval = "30s"
encoding = "json_ietf"

[[devices]]
name = "edge7"
address = "10.0.0.7:57400"
username = "telemetry"
password_env = "GTEL_PASSWORD"
paths = ["/system/state"]
mode = "once"
"#;
        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.devices.len(), 2);
        assert_eq!(config.batch.max_records, 100);
        assert_eq!(config.batch.in_flight_limit, 2);
        assert_eq!(
            config.sink.elasticsearch.index_prefix.as_deref(),
            Some("lab")
        );
        assert_eq!(config.devices[1].mode, "once");
    }

    #[test]
    fn test_no_devices_rejected() {
        let err = Config::from_str("").unwrap_err();
        assert!(matches!(err, ConfigError::NoDevicesConfigured));
    }
}
