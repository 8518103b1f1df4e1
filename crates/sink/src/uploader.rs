//! Upload worker
//!
//! Consumes sealed batches in order and uploads one at a time, so records
//! reach the backend in stream order. Retryable remainders are re-uploaded
//! with exponential backoff; accepted and rejected records are never sent
//! twice. When the per-batch budget runs out the remainder is dropped and
//! counted - nothing is held in memory indefinitely.

use std::sync::Arc;
use std::time::Duration;

use gtel_config::ElasticsearchConfig;
use gtel_protocol::Batch;
use tokio::sync::mpsc;

use crate::common::{DocumentSink, RecordStatus, UploadResult};
use crate::metrics::UploaderMetrics;

/// Retry policy for one batch
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the initial attempt
    pub max_attempts: u32,

    /// First retry delay; doubles each retry
    pub base_delay: Duration,

    /// Cap on the retry delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl From<&ElasticsearchConfig> for RetryPolicy {
    fn from(config: &ElasticsearchConfig) -> Self {
        Self {
            max_attempts: config.retry_attempts,
            base_delay: config.retry_base_delay,
            max_delay: config.retry_max_delay,
        }
    }
}

/// Per-device upload worker
pub struct Uploader<S: DocumentSink> {
    device: String,
    input: mpsc::Receiver<Batch>,
    sink: S,
    policy: RetryPolicy,
    metrics: Arc<UploaderMetrics>,
}

impl<S: DocumentSink> Uploader<S> {
    pub fn new(
        device: impl Into<String>,
        input: mpsc::Receiver<Batch>,
        sink: S,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            device: device.into(),
            input,
            sink,
            policy,
            metrics: Arc::new(UploaderMetrics::new()),
        }
    }

    /// Shared metrics handle, valid after `run` consumes the uploader
    pub fn metrics(&self) -> Arc<UploaderMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run until the batch channel closes, then drain
    pub async fn run(mut self) {
        tracing::debug!(device = %self.device, "uploader starting");

        while let Some(batch) = self.input.recv().await {
            self.metrics.record_batch_received();
            self.process(batch).await;
            self.metrics.record_batch_completed();
        }

        let snapshot = self.metrics.snapshot();
        tracing::info!(
            device = %self.device,
            batches = snapshot.batches_completed,
            accepted = snapshot.records_accepted,
            rejected = snapshot.records_rejected,
            dropped = snapshot.records_dropped,
            retries = snapshot.retries,
            "uploader shutting down"
        );
    }

    /// Upload one batch to completion, retrying the retryable remainder
    async fn process(&self, batch: Batch) {
        let mut pending = batch;
        let mut delay = self.policy.base_delay;

        for attempt in 0..=self.policy.max_attempts {
            if attempt > 0 {
                self.metrics.record_retry();
                tracing::warn!(
                    device = %self.device,
                    attempt,
                    max_attempts = self.policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    records = pending.len(),
                    "retrying batch upload"
                );
                tokio::time::sleep(delay).await;
                delay = std::cmp::min(delay * 2, self.policy.max_delay);
            }

            match self.sink.upload(&pending).await {
                Ok(result) => {
                    pending = match self.settle(pending, result) {
                        Some(remainder) => remainder,
                        None => return,
                    };
                }
                Err(e) if e.is_retryable() => {
                    // Whole batch stays pending.
                    self.metrics.record_transport_error();
                    tracing::warn!(
                        device = %self.device,
                        error = %e,
                        records = pending.len(),
                        "bulk write failed, will retry"
                    );
                }
                Err(e) => {
                    self.metrics.record_rejected(pending.len() as u64);
                    tracing::error!(
                        device = %self.device,
                        error = %e,
                        records = pending.len(),
                        "bulk write refused, dropping batch"
                    );
                    return;
                }
            }
        }

        self.metrics.record_dropped(pending.len() as u64);
        tracing::error!(
            device = %self.device,
            records = pending.len(),
            attempts = self.policy.max_attempts + 1,
            "retry budget exhausted, dropping records"
        );
    }

    /// Account for a bulk result; returns the retryable remainder, if any
    ///
    /// The remainder keeps the records' relative order, so a retried batch
    /// still reaches the backend in stream order.
    fn settle(&self, batch: Batch, result: UploadResult) -> Option<Batch> {
        let statuses = result.into_statuses();
        let mut accepted = 0u64;
        let mut rejected = 0u64;
        let mut remainder = Vec::new();

        let mut statuses = statuses.into_iter();
        for record in batch.into_records() {
            match statuses.next() {
                Some(RecordStatus::Accepted) => accepted += 1,
                Some(RecordStatus::Rejected(reason)) => {
                    rejected += 1;
                    tracing::debug!(
                        device = %self.device,
                        path = %record.path,
                        reason = %reason,
                        "record rejected by backend"
                    );
                }
                Some(RecordStatus::Retryable(_)) | None => remainder.push(record),
            }
        }

        self.metrics.record_accepted(accepted);
        self.metrics.record_rejected(rejected);

        if remainder.is_empty() {
            tracing::debug!(
                device = %self.device,
                accepted,
                rejected,
                "batch settled"
            );
            None
        } else {
            Some(Batch::from_records(remainder))
        }
    }
}

#[cfg(test)]
#[path = "uploader_test.rs"]
mod uploader_test;
