//! Device configuration

use std::path::PathBuf;
use std::time::Duration;

use gtel_protocol::{DevicePath, Encoding, StreamMode, SubscribeMode};
use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// One gNMI device to subscribe to
///
/// Each device gets its own independent pipeline. The password is never
/// stored in configuration; `password_env` names the environment variable
/// that carries it.
///
/// # Example
///
/// ```toml
/// [[devices]]
/// name = "core1"
/// address = "10.0.0.1:57400"
/// username = "telemetry"
/// password_env = "GTEL_CORE1_PASSWORD"
/// tls_ca = "/etc/gtel/core1-ca.pem"
/// paths = ["/interfaces/interface/state/counters"]
/// mode = "stream"
/// stream_mode = "sample"
/// sample_interval = "30s"
/// encoding = "json_ietf"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Device identifier, unique across the config
    pub name: String,

    /// gNMI endpoint (host:port)
    pub address: String,

    /// Username sent as request metadata
    pub username: String,

    /// Name of the environment variable holding the password
    pub password_env: String,

    /// CA certificate for TLS; plaintext when absent
    pub tls_ca: Option<PathBuf>,

    /// Override for the TLS server name check
    pub tls_server_name: Option<String>,

    /// Sensor paths to subscribe to
    pub paths: Vec<String>,

    /// Subscription mode: stream, once, or poll
    /// Default: "stream"
    pub mode: String,

    /// Per-path sampling mode: sample, on_change, or target_defined
    /// Default: "sample"
    pub stream_mode: String,

    /// Sampling interval; required for stream subscriptions in sample mode,
    /// also the snapshot interval in poll mode
    #[serde(with = "humantime_serde")]
    pub sample_interval: Option<Duration>,

    /// Heartbeat interval for on_change subscriptions
    #[serde(with = "humantime_serde")]
    pub heartbeat_interval: Option<Duration>,

    /// Payload encoding: json, json_ietf, or proto
    /// Default: "json_ietf"
    pub encoding: String,

    /// Connect (and reconnect) attempts before the pipeline gives up
    /// Default: 5
    pub max_connect_retries: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            address: String::new(),
            username: String::new(),
            password_env: String::new(),
            tls_ca: None,
            tls_server_name: None,
            paths: Vec::new(),
            mode: "stream".into(),
            stream_mode: "sample".into(),
            sample_interval: None,
            heartbeat_interval: None,
            encoding: "json_ietf".into(),
            max_connect_retries: 5,
        }
    }
}

impl DeviceConfig {
    /// Parse the configured paths
    pub fn parsed_paths(&self) -> Result<Vec<DevicePath>> {
        self.paths
            .iter()
            .map(|p| {
                p.parse().map_err(|e| {
                    ConfigError::invalid_value("device", &self.name, "paths", format!("{p}: {e}"))
                })
            })
            .collect()
    }

    /// Parse the configured subscription mode
    pub fn parsed_mode(&self) -> Result<SubscribeMode> {
        self.mode
            .parse()
            .map_err(|e| ConfigError::invalid_value("device", &self.name, "mode", format!("{e}")))
    }

    /// Parse the configured per-path sampling mode
    pub fn parsed_stream_mode(&self) -> Result<StreamMode> {
        self.stream_mode.parse().map_err(|e| {
            ConfigError::invalid_value("device", &self.name, "stream_mode", format!("{e}"))
        })
    }

    /// Parse the configured encoding
    pub fn parsed_encoding(&self) -> Result<Encoding> {
        self.encoding.parse().map_err(|e| {
            ConfigError::invalid_value("device", &self.name, "encoding", format!("{e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let device = DeviceConfig::default();
        assert_eq!(device.mode, "stream");
        assert_eq!(device.stream_mode, "sample");
        assert_eq!(device.encoding, "json_ietf");
        assert_eq!(device.max_connect_retries, 5);
    }

    #[test]
    fn test_parsed_accessors() {
        let device = DeviceConfig {
            name: "core1".into(),
            paths: vec!["/interfaces/interface[name=eth0]/state".into()],
            ..Default::default()
        };
        assert_eq!(device.parsed_paths().unwrap().len(), 1);
        assert_eq!(device.parsed_mode().unwrap(), SubscribeMode::Stream);
        assert_eq!(device.parsed_stream_mode().unwrap(), StreamMode::Sample);
        assert_eq!(device.parsed_encoding().unwrap(), Encoding::JsonIetf);
    }

    #[test]
    fn test_parsed_encoding_rejects_unknown() {
        let device = DeviceConfig {
            name: "core1".into(),
            encoding: "bytes".into(),
            ..Default::default()
        };
        let err = device.parsed_encoding().unwrap_err();
        assert!(err.to_string().contains("encoding"));
    }
}
