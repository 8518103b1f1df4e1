//! Common sink types
//!
//! The `DocumentSink` trait is the storage-backend seam: one bulk write per
//! batch, per-record acceptance statuses back. Backends and test doubles
//! both implement it.

use async_trait::async_trait;
use gtel_protocol::Batch;
use thiserror::Error;

/// Per-record outcome of a bulk write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordStatus {
    /// Indexed by the backend
    Accepted,

    /// Refused as semantically invalid; never retried
    Rejected(String),

    /// Transient failure; eligible for retry
    Retryable(String),
}

/// Outcome of one bulk write, one status per record in batch order
#[derive(Debug, Clone)]
pub struct UploadResult {
    statuses: Vec<RecordStatus>,
}

impl UploadResult {
    /// Build from explicit per-record statuses
    pub fn new(statuses: Vec<RecordStatus>) -> Self {
        Self { statuses }
    }

    /// Every record accepted
    pub fn all_accepted(len: usize) -> Self {
        Self {
            statuses: vec![RecordStatus::Accepted; len],
        }
    }

    /// Whole batch failed transiently (transport-level failure)
    pub fn all_retryable(len: usize, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            statuses: vec![RecordStatus::Retryable(reason); len],
        }
    }

    /// Statuses in batch order
    pub fn statuses(&self) -> &[RecordStatus] {
        &self.statuses
    }

    /// Consume into statuses
    pub fn into_statuses(self) -> Vec<RecordStatus> {
        self.statuses
    }

    pub fn accepted_count(&self) -> usize {
        self.statuses
            .iter()
            .filter(|s| matches!(s, RecordStatus::Accepted))
            .count()
    }

    pub fn rejected_count(&self) -> usize {
        self.statuses
            .iter()
            .filter(|s| matches!(s, RecordStatus::Rejected(_)))
            .count()
    }

    pub fn retryable_count(&self) -> usize {
        self.statuses
            .iter()
            .filter(|s| matches!(s, RecordStatus::Retryable(_)))
            .count()
    }
}

/// A storage backend accepting bulk writes
///
/// One backend call per batch; a batch is never split across sinks.
#[async_trait]
pub trait DocumentSink: Send + Sync + 'static {
    /// Perform one bulk write
    ///
    /// `Ok` carries per-record statuses (the call reached the backend);
    /// `Err` means the call itself failed and `SinkError::is_retryable`
    /// decides whether the whole batch is retried or refused.
    async fn upload(&self, batch: &Batch) -> Result<UploadResult, SinkError>;
}

/// Errors from a bulk write call
#[derive(Debug, Error)]
pub enum SinkError {
    /// The HTTP request itself failed
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status
    #[error("backend returned status {code}: {body}")]
    Status { code: u16, body: String },

    /// A document could not be serialized
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SinkError {
    /// Whether the whole batch should be retried
    ///
    /// Timeouts, connection failures, server errors, and rate limiting are
    /// transient; anything else means the request as built will never
    /// succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Status { code, .. } => *code == 429 || *code >= 500,
            Self::Serialization(_) => false,
        }
    }
}
