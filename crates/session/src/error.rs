//! Session and transport error types

use thiserror::Error;

/// Errors from the transport layer
#[derive(Debug, Error)]
pub enum TransportError {
    /// The device address could not be turned into an endpoint
    #[error("invalid endpoint '{address}': {source}")]
    InvalidEndpoint {
        address: String,
        source: tonic::transport::Error,
    },

    /// Establishing the channel failed
    #[error("connect failed: {0}")]
    Connect(tonic::transport::Error),

    /// The device rejected the subscribe RPC
    #[error("subscribe request rejected: {0}")]
    Subscribe(tonic::Status),

    /// Reading the next frame failed mid-stream
    ///
    /// Moves the session to Degraded; not fatal unless the reconnect budget
    /// is exhausted.
    #[error("stream read failed: {0}")]
    Read(tonic::Status),

    /// Username or password cannot be sent as request metadata
    #[error("credentials are not valid request metadata")]
    Credentials,

    /// The transport is closed
    #[error("transport closed")]
    Closed,
}

/// Terminal session errors
///
/// Anything recoverable (a bad update, a dropped connection within the
/// retry budget) is handled inside the session; what escapes here stops the
/// device's pipeline.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The transport could not be (re-)established within the retry budget
    #[error("device '{device}': connect failed after {attempts} attempts: {source}")]
    ConnectFailed {
        device: String,
        attempts: u32,
        #[source]
        source: TransportError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_failed_display() {
        let err = SessionError::ConnectFailed {
            device: "core1".into(),
            attempts: 6,
            source: TransportError::Closed,
        };
        let msg = err.to_string();
        assert!(msg.contains("core1"));
        assert!(msg.contains("6 attempts"));
    }
}
