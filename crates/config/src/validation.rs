//! Configuration validation
//!
//! Cross-field checks that run after TOML parsing, so a bad config fails at
//! startup with a typed error instead of mid-pipeline.

use std::collections::HashSet;

use gtel_protocol::{StreamMode, SubscribeMode};

use crate::error::{ConfigError, Result};
use crate::Config;

/// Validate the full configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.devices.is_empty() {
        return Err(ConfigError::NoDevicesConfigured);
    }

    let mut names = HashSet::new();
    for device in &config.devices {
        validate_device(device)?;
        if !names.insert(device.name.as_str()) {
            return Err(ConfigError::DuplicateDevice {
                name: device.name.clone(),
            });
        }
    }

    validate_batch(config)?;
    validate_sink(config)?;

    Ok(())
}

fn validate_device(device: &crate::DeviceConfig) -> Result<()> {
    if device.name.is_empty() {
        return Err(ConfigError::missing_field("device", "<unnamed>", "name"));
    }
    if device.address.is_empty() {
        return Err(ConfigError::missing_field("device", &device.name, "address"));
    }
    if device.paths.is_empty() {
        return Err(ConfigError::missing_field("device", &device.name, "paths"));
    }

    device.parsed_paths()?;
    device.parsed_encoding()?;
    let mode = device.parsed_mode()?;
    let stream_mode = device.parsed_stream_mode()?;

    // SAMPLE subscriptions are meaningless without an interval, and POLL
    // sessions use it as their snapshot cadence.
    let needs_interval = matches!(
        (mode, stream_mode),
        (SubscribeMode::Stream, StreamMode::Sample) | (SubscribeMode::Poll, _)
    );
    if needs_interval && device.sample_interval.is_none() {
        return Err(ConfigError::missing_field(
            "device",
            &device.name,
            "sample_interval",
        ));
    }

    Ok(())
}

fn validate_batch(config: &Config) -> Result<()> {
    if config.batch.max_records == 0 {
        return Err(ConfigError::invalid_value(
            "batch",
            "batch",
            "max_records",
            "must be at least 1",
        ));
    }
    if config.batch.in_flight_limit == 0 {
        return Err(ConfigError::invalid_value(
            "batch",
            "batch",
            "in_flight_limit",
            "must be at least 1",
        ));
    }
    if config.batch.max_age.is_zero() {
        return Err(ConfigError::invalid_value(
            "batch",
            "batch",
            "max_age",
            "must be positive",
        ));
    }
    Ok(())
}

fn validate_sink(config: &Config) -> Result<()> {
    if config.sink.elasticsearch.url.is_empty() {
        return Err(ConfigError::missing_field(
            "sink",
            "elasticsearch",
            "url",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BatchConfig, DeviceConfig};
    use std::time::Duration;

    fn device(name: &str) -> DeviceConfig {
        DeviceConfig {
            name: name.into(),
            address: "10.0.0.1:57400".into(),
            username: "telemetry".into(),
            password_env: "GTEL_PASSWORD".into(),
            paths: vec!["/interfaces/interface/state".into()],
            sample_interval: Some(Duration::from_secs(30)),
            ..Default::default()
        }
    }

    fn config_with(devices: Vec<DeviceConfig>) -> Config {
        Config {
            devices,
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&config_with(vec![device("core1")])).is_ok());
    }

    #[test]
    fn test_duplicate_names() {
        let err = validate_config(&config_with(vec![device("core1"), device("core1")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateDevice { .. }));
    }

    #[test]
    fn test_missing_paths() {
        let mut bad = device("core1");
        bad.paths.clear();
        let err = validate_config(&config_with(vec![bad])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingField { field: "paths", .. }
        ));
    }

    #[test]
    fn test_unparseable_path() {
        let mut bad = device("core1");
        bad.paths = vec!["/interfaces//state".into()];
        assert!(validate_config(&config_with(vec![bad])).is_err());
    }

    #[test]
    fn test_sample_mode_requires_interval() {
        let mut bad = device("core1");
        bad.sample_interval = None;
        let err = validate_config(&config_with(vec![bad])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingField {
                field: "sample_interval",
                ..
            }
        ));
    }

    #[test]
    fn test_on_change_needs_no_interval() {
        let mut dev = device("core1");
        dev.stream_mode = "on_change".into();
        dev.sample_interval = None;
        assert!(validate_config(&config_with(vec![dev])).is_ok());
    }

    #[test]
    fn test_poll_requires_interval() {
        let mut bad = device("core1");
        bad.mode = "poll".into();
        bad.sample_interval = None;
        assert!(validate_config(&config_with(vec![bad])).is_err());
    }

    #[test]
    fn test_bad_encoding() {
        let mut bad = device("core1");
        bad.encoding = "ascii".into();
        assert!(validate_config(&config_with(vec![bad])).is_err());
    }

    #[test]
    fn test_zero_batch_limits() {
        let mut config = config_with(vec![device("core1")]);
        config.batch = BatchConfig {
            max_records: 0,
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());

        let mut config = config_with(vec![device("core1")]);
        config.batch = BatchConfig {
            in_flight_limit: 0,
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }
}
