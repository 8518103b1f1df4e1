//! Record batcher
//!
//! Accumulates records into bounded batches and hands them to the uploader.
//! A batch seals when it reaches the record limit or when the age deadline
//! (armed at its first record) fires - whichever comes first; the two
//! triggers are independent. The sealed-batch channel has the in-flight
//! limit as its capacity, so dispatching blocks when the uploader is
//! saturated and the blockage propagates back to the session.

use std::sync::Arc;

use gtel_config::BatchConfig;
use gtel_protocol::{Batch, TelemetryRecord};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::metrics::BatcherMetrics;

/// Per-device batching stage
pub struct RecordBatcher {
    device: String,
    input: mpsc::Receiver<TelemetryRecord>,
    output: mpsc::Sender<Batch>,
    config: BatchConfig,
    metrics: Arc<BatcherMetrics>,
}

impl RecordBatcher {
    pub fn new(
        device: impl Into<String>,
        input: mpsc::Receiver<TelemetryRecord>,
        output: mpsc::Sender<Batch>,
        config: BatchConfig,
    ) -> Self {
        Self {
            device: device.into(),
            input,
            output,
            config,
            metrics: Arc::new(BatcherMetrics::new()),
        }
    }

    /// Shared metrics handle, valid after `run` consumes the batcher
    pub fn metrics(&self) -> Arc<BatcherMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run until the record channel closes, then flush the partial batch
    pub async fn run(mut self) {
        tracing::debug!(
            device = %self.device,
            max_records = self.config.max_records,
            max_age_ms = self.config.max_age.as_millis() as u64,
            "record batcher starting"
        );

        let mut open = Batch::with_capacity(self.config.max_records);
        // Armed when the first record enters an open batch
        let mut deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                record = self.input.recv() => match record {
                    Some(record) => {
                        if open.is_empty() {
                            deadline = Some(Instant::now() + self.config.max_age);
                        }
                        open.push(record);
                        self.metrics.record_received();

                        if open.len() >= self.config.max_records {
                            let sealed = std::mem::replace(
                                &mut open,
                                Batch::with_capacity(self.config.max_records),
                            );
                            deadline = None;
                            self.metrics.record_sealed_by_count();
                            if !self.dispatch(sealed).await {
                                return;
                            }
                        }
                    }
                    None => break,
                },
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)),
                    if deadline.is_some() =>
                {
                    deadline = None;
                    if !open.is_empty() {
                        let sealed = std::mem::replace(
                            &mut open,
                            Batch::with_capacity(self.config.max_records),
                        );
                        self.metrics.record_sealed_by_age();
                        if !self.dispatch(sealed).await {
                            return;
                        }
                    }
                }
            }
        }

        // Graceful shutdown: the partial batch still goes out.
        if !open.is_empty() {
            self.metrics.record_sealed_on_close();
            self.dispatch(open).await;
        }

        let snapshot = self.metrics.snapshot();
        tracing::debug!(
            device = %self.device,
            records = snapshot.records_received,
            by_count = snapshot.batches_sealed_by_count,
            by_age = snapshot.batches_sealed_by_age,
            on_close = snapshot.batches_sealed_on_close,
            "record batcher shutting down"
        );
    }

    /// Hand a sealed batch to the uploader
    ///
    /// Blocks while the in-flight window is full - that stall, not a drop,
    /// is how a slow sink reaches the session. Returns false if the
    /// uploader is gone.
    async fn dispatch(&self, batch: Batch) -> bool {
        let records = batch.len() as u64;
        match self.output.send(batch).await {
            Ok(()) => {
                self.metrics.record_dispatched(records);
                true
            }
            Err(_) => {
                self.metrics.record_dropped(records);
                tracing::warn!(
                    device = %self.device,
                    records,
                    "uploader went away, dropping sealed batch"
                );
                false
            }
        }
    }
}

#[cfg(test)]
#[path = "batcher_test.rs"]
mod batcher_test;
