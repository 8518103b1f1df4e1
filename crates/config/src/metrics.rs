//! Metrics reporting configuration

use serde::Deserialize;
use std::time::Duration;

/// Metrics reporting configuration
///
/// The collector logs a per-device counter snapshot at this interval.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Whether periodic reporting is enabled
    /// Default: true
    pub enabled: bool,

    /// Reporting interval
    /// Default: 10s
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MetricsConfig::default();
        assert!(config.enabled);
        assert_eq!(config.interval, Duration::from_secs(10));
    }
}
