//! Batcher metrics

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for the record batcher
///
/// All counters use relaxed ordering; values are eventually consistent.
#[derive(Debug, Default)]
pub struct BatcherMetrics {
    /// Records taken off the session channel
    pub records_received: AtomicU64,

    /// Batches sealed because they hit the record limit
    pub batches_sealed_by_count: AtomicU64,

    /// Batches sealed because the age deadline fired
    pub batches_sealed_by_age: AtomicU64,

    /// Partial batches sealed during shutdown drain
    pub batches_sealed_on_close: AtomicU64,

    /// Batches handed to the uploader
    pub batches_dispatched: AtomicU64,

    /// Records handed to the uploader
    pub records_dispatched: AtomicU64,

    /// Records lost because the uploader went away
    pub records_dropped: AtomicU64,
}

impl BatcherMetrics {
    /// Create new metrics with all counters at zero
    pub const fn new() -> Self {
        Self {
            records_received: AtomicU64::new(0),
            batches_sealed_by_count: AtomicU64::new(0),
            batches_sealed_by_age: AtomicU64::new(0),
            batches_sealed_on_close: AtomicU64::new(0),
            batches_dispatched: AtomicU64::new(0),
            records_dispatched: AtomicU64::new(0),
            records_dropped: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_received(&self) {
        self.records_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_sealed_by_count(&self) {
        self.batches_sealed_by_count.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_sealed_by_age(&self) {
        self.batches_sealed_by_age.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_sealed_on_close(&self) {
        self.batches_sealed_on_close.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_dispatched(&self, record_count: u64) {
        self.batches_dispatched.fetch_add(1, Ordering::Relaxed);
        self.records_dispatched
            .fetch_add(record_count, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_dropped(&self, record_count: u64) {
        self.records_dropped.fetch_add(record_count, Ordering::Relaxed);
    }

    /// Get a snapshot of all counters
    pub fn snapshot(&self) -> BatcherMetricsSnapshot {
        BatcherMetricsSnapshot {
            records_received: self.records_received.load(Ordering::Relaxed),
            batches_sealed_by_count: self.batches_sealed_by_count.load(Ordering::Relaxed),
            batches_sealed_by_age: self.batches_sealed_by_age.load(Ordering::Relaxed),
            batches_sealed_on_close: self.batches_sealed_on_close.load(Ordering::Relaxed),
            batches_dispatched: self.batches_dispatched.load(Ordering::Relaxed),
            records_dispatched: self.records_dispatched.load(Ordering::Relaxed),
            records_dropped: self.records_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of batcher metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatcherMetricsSnapshot {
    pub records_received: u64,
    pub batches_sealed_by_count: u64,
    pub batches_sealed_by_age: u64,
    pub batches_sealed_on_close: u64,
    pub batches_dispatched: u64,
    pub records_dispatched: u64,
    pub records_dropped: u64,
}
