//! Exponential backoff with jitter
//!
//! Delay doubles per attempt from the base up to the cap, then a jitter
//! factor spreads reconnecting sessions so a flapping device does not see
//! synchronized retries.

use std::time::Duration;

use rand::Rng;

/// Exponential backoff state for one retry episode
#[derive(Debug)]
pub struct Backoff {
    base: Duration,
    cap: Duration,
    jitter: f64,
    attempt: u32,
}

impl Backoff {
    /// Create a backoff schedule
    ///
    /// `jitter` is the half-width of the random window: 0.2 means each
    /// delay lands within ±20% of its nominal value.
    pub fn new(base: Duration, cap: Duration, jitter: f64) -> Self {
        Self {
            base,
            cap,
            jitter,
            attempt: 0,
        }
    }

    /// Next delay to wait before retrying
    pub fn next_delay(&mut self) -> Duration {
        // Shift capped at 64x so the multiplier cannot overflow
        let nominal = self
            .base
            .saturating_mul(1u32 << self.attempt.min(6))
            .min(self.cap);
        self.attempt = self.attempt.saturating_add(1);

        if self.jitter <= 0.0 {
            return nominal;
        }
        let factor = rand::thread_rng().gen_range(1.0 - self.jitter..=1.0 + self.jitter);
        Duration::from_secs_f64(nominal.as_secs_f64() * factor)
    }

    /// Attempts taken so far in this episode
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Reset after a successful connect
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
