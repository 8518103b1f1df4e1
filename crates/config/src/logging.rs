//! Logging configuration

use serde::Deserialize;

/// Logging configuration
///
/// The level string accepts anything `tracing_subscriber::EnvFilter` does,
/// including per-target directives (`info,gtel_session=debug`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log filter
    /// Default: "info"
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}
