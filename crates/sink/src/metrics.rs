//! Uploader metrics

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for the upload worker
///
/// All counters use relaxed ordering; values are eventually consistent.
#[derive(Debug, Default)]
pub struct UploaderMetrics {
    /// Batches taken off the queue
    pub batches_received: AtomicU64,

    /// Batches fully processed (uploaded, rejected, or dropped)
    pub batches_completed: AtomicU64,

    /// Records accepted by the backend
    pub records_accepted: AtomicU64,

    /// Records the backend refused (never retried)
    pub records_rejected: AtomicU64,

    /// Records dropped after the retry budget ran out, or abandoned by a
    /// forced shutdown
    pub records_dropped: AtomicU64,

    /// Upload retries performed
    pub retries: AtomicU64,

    /// Bulk calls that failed at the transport level
    pub transport_errors: AtomicU64,
}

impl UploaderMetrics {
    /// Create new metrics with all counters at zero
    pub const fn new() -> Self {
        Self {
            batches_received: AtomicU64::new(0),
            batches_completed: AtomicU64::new(0),
            records_accepted: AtomicU64::new(0),
            records_rejected: AtomicU64::new(0),
            records_dropped: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            transport_errors: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_batch_received(&self) {
        self.batches_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_batch_completed(&self) {
        self.batches_completed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_accepted(&self, count: u64) {
        self.records_accepted.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_rejected(&self, count: u64) {
        self.records_rejected.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_dropped(&self, count: u64) {
        self.records_dropped.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_transport_error(&self) {
        self.transport_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all counters
    pub fn snapshot(&self) -> UploaderMetricsSnapshot {
        UploaderMetricsSnapshot {
            batches_received: self.batches_received.load(Ordering::Relaxed),
            batches_completed: self.batches_completed.load(Ordering::Relaxed),
            records_accepted: self.records_accepted.load(Ordering::Relaxed),
            records_rejected: self.records_rejected.load(Ordering::Relaxed),
            records_dropped: self.records_dropped.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of uploader metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploaderMetricsSnapshot {
    pub batches_received: u64,
    pub batches_completed: u64,
    pub records_accepted: u64,
    pub records_rejected: u64,
    pub records_dropped: u64,
    pub retries: u64,
    pub transport_errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = UploaderMetrics::new();
        metrics.record_batch_received();
        metrics.record_accepted(8);
        metrics.record_rejected(2);
        metrics.record_batch_completed();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.batches_received, 1);
        assert_eq!(snapshot.batches_completed, 1);
        assert_eq!(snapshot.records_accepted, 8);
        assert_eq!(snapshot.records_rejected, 2);
        assert_eq!(snapshot.records_dropped, 0);
    }
}
