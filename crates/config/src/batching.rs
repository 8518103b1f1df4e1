//! Batching and backpressure configuration

use serde::Deserialize;
use std::time::Duration;

/// Batching limits for each device pipeline
///
/// A batch seals when it reaches `max_records` or when `max_age` has passed
/// since its first record, whichever comes first. `in_flight_limit` bounds
/// how many sealed batches may be awaiting upload; past it, the pipeline
/// blocks and the session stops reading from the device.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Maximum records per batch
    /// Default: 1000
    pub max_records: usize,

    /// Maximum age of a batch before it is sealed regardless of size
    /// Default: 5s
    #[serde(with = "humantime_serde")]
    pub max_age: Duration,

    /// Maximum sealed-but-unacknowledged batches per device
    /// Default: 4
    pub in_flight_limit: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_records: 1000,
            max_age: Duration::from_secs(5),
            in_flight_limit: 4,
        }
    }
}
