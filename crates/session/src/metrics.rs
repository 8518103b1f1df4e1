//! Session metrics
//!
//! Atomic counters owned by the session and shared out as an `Arc` handle
//! so the coordinator can snapshot them after `run()` consumes the session.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for one subscription session
#[derive(Debug, Default)]
pub struct SessionMetrics {
    /// Connect attempts (including reconnects)
    pub connect_attempts: AtomicU64,

    /// Degraded episodes that triggered a reconnect
    pub reconnects: AtomicU64,

    /// Records successfully decoded and emitted
    pub records_decoded: AtomicU64,

    /// Updates dropped because they failed to decode
    pub decode_errors: AtomicU64,

    /// Sync boundaries observed
    pub sync_markers: AtomicU64,
}

impl SessionMetrics {
    /// Create new metrics with all counters at zero
    pub const fn new() -> Self {
        Self {
            connect_attempts: AtomicU64::new(0),
            reconnects: AtomicU64::new(0),
            records_decoded: AtomicU64::new(0),
            decode_errors: AtomicU64::new(0),
            sync_markers: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_connect_attempt(&self) {
        self.connect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_decoded(&self) {
        self.records_decoded.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_sync_marker(&self) {
        self.sync_markers.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all counters
    pub fn snapshot(&self) -> SessionMetricsSnapshot {
        SessionMetricsSnapshot {
            connect_attempts: self.connect_attempts.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
            records_decoded: self.records_decoded.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            sync_markers: self.sync_markers.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of session metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionMetricsSnapshot {
    pub connect_attempts: u64,
    pub reconnects: u64,
    pub records_decoded: u64,
    pub decode_errors: u64,
    pub sync_markers: u64,
}
