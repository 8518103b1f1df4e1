//! Pipeline coordinator
//!
//! Wires one session + batcher + uploader chain per configured device,
//! supervises lifecycle, and aggregates per-device counters for
//! observability. A failing device takes down only its own pipeline.

use std::sync::Arc;
use std::time::Duration;

use gtel_config::BatchConfig;
use gtel_session::{
    SessionError, SessionMetrics, SessionState, SubscribeTransport, SubscriptionSession,
    SubscriptionSpec,
};
use gtel_sink::{DocumentSink, RetryPolicy, Uploader, UploaderMetrics};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::batcher::RecordBatcher;
use crate::metrics::BatcherMetrics;
use crate::RECORD_QUEUE_SIZE;

/// Aggregate counters for one device's pipeline
#[derive(Debug, Clone)]
pub struct PipelineSnapshot {
    pub device: String,
    pub state: SessionState,

    /// Records decoded from the device
    pub records_received: u64,
    /// Updates dropped at decode time
    pub decode_errors: u64,
    /// Reconnect episodes
    pub reconnects: u64,

    /// Records accepted by the backend
    pub records_uploaded: u64,
    /// Records the backend refused
    pub records_rejected: u64,
    /// Records dropped (retry exhaustion, forced shutdown, dead uploader)
    pub records_dropped: u64,
    /// Upload retries performed
    pub upload_retries: u64,

    /// Sealed batches not yet fully processed by the uploader
    pub queue_depth: u64,
}

/// Read-only view of one pipeline's state and counters
///
/// Cloneable and independent of the running tasks, so the metrics reporter
/// can keep observing after the coordinator hands out ownership.
#[derive(Clone)]
pub struct PipelineObserver {
    pub(crate) device: String,
    pub(crate) state: watch::Receiver<SessionState>,
    pub(crate) session: Arc<SessionMetrics>,
    pub(crate) batcher: Arc<BatcherMetrics>,
    pub(crate) uploader: Arc<UploaderMetrics>,
}

impl PipelineObserver {
    /// Device this observer watches
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Current aggregate counters
    pub fn snapshot(&self) -> PipelineSnapshot {
        let session = self.session.snapshot();
        let batcher = self.batcher.snapshot();
        let uploader = self.uploader.snapshot();

        PipelineSnapshot {
            device: self.device.clone(),
            state: *self.state.borrow(),
            records_received: session.records_decoded,
            decode_errors: session.decode_errors,
            reconnects: session.reconnects,
            records_uploaded: uploader.records_accepted,
            records_rejected: uploader.records_rejected,
            records_dropped: uploader.records_dropped + batcher.records_dropped,
            upload_retries: uploader.retries,
            queue_depth: batcher
                .batches_dispatched
                .saturating_sub(uploader.batches_completed),
        }
    }
}

/// Running tasks of one device's pipeline
struct PipelineHandle {
    observer: PipelineObserver,
    session_task: JoinHandle<Result<(), SessionError>>,
    batcher_task: JoinHandle<()>,
    uploader_task: JoinHandle<()>,
}

impl PipelineHandle {
    /// Join the pipeline's tasks, aborting whatever outlives the deadline
    async fn finish(mut self, deadline: tokio::time::Instant) {
        let device = self.observer.device.clone();
        let mut forced = false;

        match tokio::time::timeout_at(deadline, &mut self.session_task).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => {
                tracing::error!(device = %device, error = %e, "session ended with error")
            }
            Ok(Err(e)) => tracing::error!(device = %device, error = %e, "session task panicked"),
            Err(_) => {
                forced = true;
                self.session_task.abort();
            }
        }

        if tokio::time::timeout_at(deadline, &mut self.batcher_task)
            .await
            .is_err()
        {
            forced = true;
            self.batcher_task.abort();
        }
        if tokio::time::timeout_at(deadline, &mut self.uploader_task)
            .await
            .is_err()
        {
            forced = true;
            self.uploader_task.abort();
        }

        if forced {
            // Whatever was still in flight is gone; surface it in the drop
            // counter so the loss is observable.
            let snapshot = self.observer.snapshot();
            let abandoned = snapshot
                .records_received
                .saturating_sub(snapshot.records_uploaded)
                .saturating_sub(snapshot.records_rejected)
                .saturating_sub(snapshot.records_dropped);
            if abandoned > 0 {
                self.observer.uploader.record_dropped(abandoned);
            }
            tracing::warn!(
                device = %device,
                abandoned,
                "forced shutdown abandoned in-flight records"
            );
        } else {
            tracing::info!(device = %device, "pipeline drained");
        }
    }
}

/// Supervisor for all device pipelines
pub struct PipelineCoordinator {
    cancel: CancellationToken,
    pipelines: Vec<PipelineHandle>,
}

impl PipelineCoordinator {
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            pipelines: Vec::new(),
        }
    }

    /// Token that stops every pipeline when cancelled
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Number of running pipelines
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    /// Observers for every pipeline (for the metrics reporter)
    pub fn observers(&self) -> Vec<PipelineObserver> {
        self.pipelines.iter().map(|p| p.observer.clone()).collect()
    }

    /// Current aggregate counters for every pipeline
    pub fn snapshots(&self) -> Vec<PipelineSnapshot> {
        self.pipelines
            .iter()
            .map(|p| p.observer.snapshot())
            .collect()
    }

    /// Start one device's pipeline
    ///
    /// The three stages are connected by bounded channels; the sealed-batch
    /// channel's capacity is the configured in-flight limit.
    pub fn spawn<T, S>(
        &mut self,
        spec: SubscriptionSpec,
        transport: T,
        sink: S,
        batch: BatchConfig,
        retry: RetryPolicy,
    ) where
        T: SubscribeTransport,
        S: DocumentSink,
    {
        let device = spec.device.clone();
        let (record_tx, record_rx) = mpsc::channel(RECORD_QUEUE_SIZE);
        let (batch_tx, batch_rx) = mpsc::channel(batch.in_flight_limit);

        let session = SubscriptionSession::new(spec, transport);
        let state = session.state_receiver();
        let session_metrics = session.metrics();

        let batcher = RecordBatcher::new(device.clone(), record_rx, batch_tx, batch);
        let batcher_metrics = batcher.metrics();

        let uploader = Uploader::new(device.clone(), batch_rx, sink, retry);
        let uploader_metrics = uploader.metrics();

        let observer = PipelineObserver {
            device: device.clone(),
            state,
            session: session_metrics,
            batcher: batcher_metrics,
            uploader: uploader_metrics,
        };

        let session_task = tokio::spawn(session.run(record_tx, self.cancel.child_token()));
        let batcher_task = tokio::spawn(batcher.run());
        let uploader_task = tokio::spawn(uploader.run());

        tracing::info!(device = %device, "pipeline started");
        self.pipelines.push(PipelineHandle {
            observer,
            session_task,
            batcher_task,
            uploader_task,
        });
    }

    /// Stop every pipeline
    ///
    /// Cancels the sessions, then drains: record channels close, partial
    /// batches seal, queued batches upload. Pipelines that have not drained
    /// by the grace deadline are aborted and their in-flight records
    /// counted as dropped.
    pub async fn shutdown(self, grace: Duration) {
        tracing::info!(
            pipelines = self.pipelines.len(),
            grace_ms = grace.as_millis() as u64,
            "stopping pipelines"
        );
        self.cancel.cancel();

        let deadline = tokio::time::Instant::now() + grace;
        for pipeline in self.pipelines {
            pipeline.finish(deadline).await;
        }
        tracing::info!("all pipelines stopped");
    }
}

impl Default for PipelineCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Periodically log every pipeline's counters
///
/// The observability surface: one structured line per device per interval,
/// consumable by log shippers.
pub async fn report_loop(
    observers: Vec<PipelineObserver>,
    interval: Duration,
    cancel: CancellationToken,
) {
    if observers.is_empty() {
        return;
    }

    let mut ticker = tokio::time::interval(interval);
    // The immediate first tick would log all zeros.
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                for observer in &observers {
                    let s = observer.snapshot();
                    tracing::info!(
                        device = %s.device,
                        state = %s.state,
                        received = s.records_received,
                        uploaded = s.records_uploaded,
                        rejected = s.records_rejected,
                        dropped = s.records_dropped,
                        decode_errors = s.decode_errors,
                        reconnects = s.reconnects,
                        retries = s.upload_retries,
                        queue_depth = s.queue_depth,
                        "pipeline status"
                    );
                }
            }
        }
    }
}
