//! Subscription specification
//!
//! Everything a session needs to (re-)establish its subscription. Immutable
//! once the session starts, so a Degraded session can re-subscribe with the
//! identical request.

use std::fmt;
use std::time::Duration;

use gtel_protocol::{DevicePath, Encoding, StreamMode, SubscribeMode};

/// Device credentials, sent as gNMI request metadata
///
/// The secret is resolved by the surrounding application (from the
/// environment) and never appears in configuration files or Debug output.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// TLS material for the device channel, supplied opaquely by the caller
#[derive(Clone)]
pub struct TlsSettings {
    /// CA certificate in PEM form
    pub ca_pem: Vec<u8>,

    /// Server name override for certificate validation; some platforms
    /// present certificates for a fixed management hostname
    pub server_name: Option<String>,
}

impl fmt::Debug for TlsSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsSettings")
            .field("ca_pem_bytes", &self.ca_pem.len())
            .field("server_name", &self.server_name)
            .finish()
    }
}

/// Full subscription configuration for one device
#[derive(Debug, Clone)]
pub struct SubscriptionSpec {
    /// Device identifier used on every record
    pub device: String,

    /// gNMI endpoint (host:port)
    pub address: String,

    /// Request credentials
    pub credentials: Credentials,

    /// TLS settings; plaintext channel when absent
    pub tls: Option<TlsSettings>,

    /// Sensor paths to subscribe to
    pub paths: Vec<DevicePath>,

    /// Subscription list mode
    pub mode: SubscribeMode,

    /// Per-path sampling mode for STREAM subscriptions
    pub stream_mode: StreamMode,

    /// Sample interval (required for sampled streams, snapshot cadence for
    /// POLL sessions)
    pub sample_interval: Option<Duration>,

    /// Heartbeat interval for on-change subscriptions
    pub heartbeat_interval: Option<Duration>,

    /// Payload encoding
    pub encoding: Encoding,

    /// Connect attempts per episode before the session gives up
    pub max_connect_retries: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_password() {
        let creds = Credentials {
            username: "telemetry".into(),
            password: "hunter2".into(),
        };
        let debug = format!("{creds:?}");
        assert!(debug.contains("telemetry"));
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_debug_elides_pem() {
        let tls = TlsSettings {
            ca_pem: vec![0u8; 1024],
            server_name: Some("ems.example.com".into()),
        };
        let debug = format!("{tls:?}");
        assert!(debug.contains("1024"));
        assert!(debug.contains("ems.example.com"));
    }
}
