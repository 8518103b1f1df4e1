//! Subscription session
//!
//! Owns the live connection and the session state exclusively. The run loop
//! reads frames, decodes updates into records, and pushes them downstream;
//! every suspension point honors cancellation, and a mid-stream read error
//! degrades the session instead of killing it.

use std::sync::Arc;
use std::time::Duration;

use gtel_proto::gnmi;
use gtel_protocol::{collection_timestamp_ns, decode_update, SubscribeMode, TelemetryRecord};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::backoff::Backoff;
use crate::error::{SessionError, TransportError};
use crate::metrics::SessionMetrics;
use crate::spec::SubscriptionSpec;
use crate::transport::{Frame, FrameStream, SubscribeTransport};

/// Reconnect backoff: base 1s, cap 60s, jitter ±20%
const CONNECT_BASE_DELAY: Duration = Duration::from_secs(1);
const CONNECT_MAX_DELAY: Duration = Duration::from_secs(60);
const CONNECT_JITTER: f64 = 0.2;

/// Fallback poll cadence; configuration validation normally guarantees an
/// explicit interval for POLL sessions
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Establishing the transport and sending the subscription
    Connecting,
    /// Waiting for the initial sync boundary
    Subscribed,
    /// Yielding records continuously
    Streaming,
    /// Lost the transport; reconnecting with backoff
    Degraded,
    /// Done - cancelled, completed (ONCE), or failed
    Closed,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Subscribed => "subscribed",
            Self::Streaming => "streaming",
            Self::Degraded => "degraded",
            Self::Closed => "closed",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a consume loop ended
enum Exit {
    /// The snapshot's sync boundary arrived (ONCE / POLL)
    Completed(usize),
    /// Cancellation observed, or the downstream consumer went away
    Cancelled,
    /// Transport dropped; reconnect wanted
    Degraded,
}

/// One long-lived subscription to one device
///
/// Generic over the transport so the run loop is testable without a device.
pub struct SubscriptionSession<T: SubscribeTransport> {
    spec: SubscriptionSpec,
    transport: T,
    stream: Option<T::Stream>,

    /// Device id shared into every record
    device: Arc<str>,

    /// True once the initial-dump sync boundary has been observed on the
    /// current connection
    synced: bool,

    state_tx: watch::Sender<SessionState>,
    metrics: Arc<SessionMetrics>,
}

impl<T: SubscribeTransport> SubscriptionSession<T> {
    /// Create a session; nothing connects until `run` (or `poll`) is called
    pub fn new(spec: SubscriptionSpec, transport: T) -> Self {
        let device = Arc::from(spec.device.as_str());
        let (state_tx, _) = watch::channel(SessionState::Connecting);
        Self {
            spec,
            transport,
            stream: None,
            device,
            synced: false,
            state_tx,
            metrics: Arc::new(SessionMetrics::new()),
        }
    }

    /// Watch the session state (for coordinator reporting)
    pub fn state_receiver(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Shared metrics handle, valid after `run` consumes the session
    pub fn metrics(&self) -> Arc<SessionMetrics> {
        Arc::clone(&self.metrics)
    }

    /// The immutable spec this session (re-)subscribes with
    pub fn spec(&self) -> &SubscriptionSpec {
        &self.spec
    }

    /// Run the session until cancellation, completion, or terminal failure
    ///
    /// Decoded records go to `output` in stream order; a full channel blocks
    /// the read loop, which is the backpressure path. Cancellation is
    /// honored at every suspension point and no record is emitted after it
    /// is acknowledged.
    pub async fn run(
        mut self,
        output: mpsc::Sender<TelemetryRecord>,
        cancel: CancellationToken,
    ) -> Result<(), SessionError> {
        tracing::info!(
            device = %self.device,
            address = %self.spec.address,
            mode = %self.spec.mode,
            paths = self.spec.paths.len(),
            encoding = %self.spec.encoding,
            "subscription session starting"
        );

        let result = match self.spec.mode {
            SubscribeMode::Stream => self.run_stream(&output, &cancel).await,
            SubscribeMode::Once => self.run_once(&output, &cancel).await,
            SubscribeMode::Poll => self.run_poll(&output, &cancel).await,
        };

        if let Some(mut stream) = self.stream.take() {
            stream.close().await;
        }
        self.set_state(SessionState::Closed);

        let snapshot = self.metrics.snapshot();
        match &result {
            Ok(()) => tracing::info!(
                device = %self.device,
                records = snapshot.records_decoded,
                decode_errors = snapshot.decode_errors,
                reconnects = snapshot.reconnects,
                "subscription session closed"
            ),
            Err(e) => tracing::error!(
                device = %self.device,
                records = snapshot.records_decoded,
                error = %e,
                "subscription session failed"
            ),
        }

        result
    }

    /// Request one snapshot and return once its sync boundary is observed
    ///
    /// The POLL-mode primitive: connects on first use (the initial snapshot
    /// arrives unprompted after subscribing), afterwards sends an explicit
    /// poll trigger. Returns the number of records emitted, or `None` when
    /// cancelled.
    pub async fn poll(
        &mut self,
        output: &mpsc::Sender<TelemetryRecord>,
        cancel: &CancellationToken,
    ) -> Result<Option<usize>, SessionError> {
        loop {
            let fresh = self.stream.is_none();
            if !self.ensure_connected(cancel).await? {
                return Ok(None);
            }
            let Some(mut stream) = self.stream.take() else {
                continue;
            };

            if !fresh {
                if let Err(e) = stream.request_poll().await {
                    tracing::warn!(device = %self.device, error = %e, "poll trigger failed");
                    stream.close().await;
                    self.degrade();
                    continue;
                }
            }

            match self.drain_snapshot(&mut stream, output, cancel).await {
                Exit::Completed(count) => {
                    self.stream = Some(stream);
                    return Ok(Some(count));
                }
                Exit::Cancelled => {
                    stream.close().await;
                    return Ok(None);
                }
                Exit::Degraded => {
                    stream.close().await;
                    self.degrade();
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Mode loops
    // ------------------------------------------------------------------

    async fn run_stream(
        &mut self,
        output: &mpsc::Sender<TelemetryRecord>,
        cancel: &CancellationToken,
    ) -> Result<(), SessionError> {
        loop {
            if !self.ensure_connected(cancel).await? {
                return Ok(());
            }
            let Some(mut stream) = self.stream.take() else {
                continue;
            };

            match self.consume_stream(&mut stream, output, cancel).await {
                Exit::Cancelled => {
                    stream.close().await;
                    return Ok(());
                }
                Exit::Completed(_) | Exit::Degraded => {
                    stream.close().await;
                    self.degrade();
                }
            }
        }
    }

    async fn run_once(
        &mut self,
        output: &mpsc::Sender<TelemetryRecord>,
        cancel: &CancellationToken,
    ) -> Result<(), SessionError> {
        loop {
            if !self.ensure_connected(cancel).await? {
                return Ok(());
            }
            let Some(mut stream) = self.stream.take() else {
                continue;
            };

            match self.drain_snapshot(&mut stream, output, cancel).await {
                Exit::Completed(count) => {
                    tracing::info!(device = %self.device, records = count, "once snapshot complete");
                    stream.close().await;
                    return Ok(());
                }
                Exit::Cancelled => {
                    stream.close().await;
                    return Ok(());
                }
                Exit::Degraded => {
                    stream.close().await;
                    self.degrade();
                }
            }
        }
    }

    async fn run_poll(
        &mut self,
        output: &mpsc::Sender<TelemetryRecord>,
        cancel: &CancellationToken,
    ) -> Result<(), SessionError> {
        let interval = self.spec.sample_interval.unwrap_or(DEFAULT_POLL_INTERVAL);
        loop {
            match self.poll(output, cancel).await? {
                None => return Ok(()),
                Some(count) => {
                    tracing::debug!(device = %self.device, records = count, "poll snapshot complete");
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }

    // ------------------------------------------------------------------
    // Frame consumption
    // ------------------------------------------------------------------

    /// Consume a STREAM subscription until cancellation or transport loss
    async fn consume_stream(
        &mut self,
        stream: &mut T::Stream,
        output: &mpsc::Sender<TelemetryRecord>,
        cancel: &CancellationToken,
    ) -> Exit {
        loop {
            let frame = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Exit::Cancelled,
                frame = stream.next_frame() => frame,
            };

            match frame {
                Ok(Some(Frame::Notification(notification))) => {
                    if self
                        .emit_notification(&notification, output, cancel)
                        .await
                        .is_none()
                    {
                        return Exit::Cancelled;
                    }
                }
                Ok(Some(Frame::SyncResponse)) => {
                    self.synced = true;
                    self.metrics.record_sync_marker();
                    self.set_state(SessionState::Streaming);
                    tracing::debug!(device = %self.device, "initial sync complete");
                }
                Ok(None) => {
                    tracing::warn!(device = %self.device, "device ended the stream");
                    return Exit::Degraded;
                }
                Err(e) => {
                    tracing::warn!(device = %self.device, error = %e, "transport read failed");
                    return Exit::Degraded;
                }
            }
        }
    }

    /// Consume one snapshot (ONCE or POLL): records until the sync boundary
    async fn drain_snapshot(
        &mut self,
        stream: &mut T::Stream,
        output: &mpsc::Sender<TelemetryRecord>,
        cancel: &CancellationToken,
    ) -> Exit {
        let mut emitted = 0usize;
        loop {
            let frame = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Exit::Cancelled,
                frame = stream.next_frame() => frame,
            };

            match frame {
                Ok(Some(Frame::Notification(notification))) => {
                    match self.emit_notification(&notification, output, cancel).await {
                        Some(count) => emitted += count,
                        None => return Exit::Cancelled,
                    }
                }
                Ok(Some(Frame::SyncResponse)) => {
                    self.metrics.record_sync_marker();
                    return Exit::Completed(emitted);
                }
                Ok(None) => {
                    tracing::warn!(
                        device = %self.device,
                        "stream ended before the snapshot's sync boundary"
                    );
                    return Exit::Degraded;
                }
                Err(e) => {
                    tracing::warn!(device = %self.device, error = %e, "transport read failed");
                    return Exit::Degraded;
                }
            }
        }
    }

    /// Decode and forward every update in a notification
    ///
    /// Returns the number of records emitted, or `None` when cancellation
    /// was observed or the consumer went away; in either case no further
    /// records may be emitted.
    async fn emit_notification(
        &self,
        notification: &gnmi::Notification,
        output: &mpsc::Sender<TelemetryRecord>,
        cancel: &CancellationToken,
    ) -> Option<usize> {
        let collected_ns = collection_timestamp_ns();
        let mut emitted = 0usize;

        for update in &notification.update {
            match decode_update(
                &self.device,
                notification.prefix.as_ref(),
                update,
                notification.timestamp,
                collected_ns,
                self.synced,
            ) {
                Ok(record) => {
                    let sent = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return None,
                        result = output.send(record) => result.is_ok(),
                    };
                    if !sent {
                        tracing::debug!(device = %self.device, "record consumer went away");
                        return None;
                    }
                    self.metrics.record_decoded();
                    emitted += 1;
                }
                Err(e) => {
                    self.metrics.record_decode_error();
                    tracing::debug!(device = %self.device, error = %e, "dropping undecodable update");
                }
            }
        }

        Some(emitted)
    }

    // ------------------------------------------------------------------
    // Connection management
    // ------------------------------------------------------------------

    /// Connect if there is no live stream, retrying with backoff
    ///
    /// Returns `Ok(false)` when cancelled; `Err(ConnectFailed)` when the
    /// retry budget runs out.
    async fn ensure_connected(&mut self, cancel: &CancellationToken) -> Result<bool, SessionError> {
        if self.stream.is_some() {
            return Ok(true);
        }

        let retries = self.spec.max_connect_retries;
        let mut backoff = Backoff::new(CONNECT_BASE_DELAY, CONNECT_MAX_DELAY, CONNECT_JITTER);
        let mut last_error: Option<TransportError> = None;

        for attempt in 0..=retries {
            if attempt > 0 {
                let delay = backoff.next_delay();
                tracing::warn!(
                    device = %self.device,
                    attempt,
                    max_attempts = retries + 1,
                    delay_ms = delay.as_millis() as u64,
                    "retrying connect"
                );
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Ok(false),
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            self.metrics.record_connect_attempt();
            let opened = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(false),
                result = self.transport.open(&self.spec) => result,
            };

            match opened {
                Ok(stream) => {
                    tracing::info!(
                        device = %self.device,
                        address = %self.spec.address,
                        "subscribed"
                    );
                    self.stream = Some(stream);
                    self.synced = false;
                    self.set_state(SessionState::Subscribed);
                    return Ok(true);
                }
                Err(e) => {
                    tracing::warn!(device = %self.device, attempt, error = %e, "connect failed");
                    last_error = Some(e);
                }
            }
        }

        Err(SessionError::ConnectFailed {
            device: self.spec.device.clone(),
            attempts: retries + 1,
            source: last_error.unwrap_or(TransportError::Closed),
        })
    }

    /// Note a lost transport and arm a reconnect
    fn degrade(&mut self) {
        self.stream = None;
        self.synced = false;
        self.metrics.record_reconnect();
        self.set_state(SessionState::Degraded);
    }

    fn set_state(&self, state: SessionState) {
        self.state_tx.send_replace(state);
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;
