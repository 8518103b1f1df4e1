//! gtel sink - bulk upload to the storage backend
//!
//! Takes sealed batches and performs one bulk write per batch against
//! Elasticsearch, classifying the outcome per record:
//!
//! - **Accepted** - indexed; never sent again
//! - **Rejected** - the backend refused the document; never retried
//! - **Retryable** - transient (429/503, transport failure); the remainder
//!   is re-uploaded with exponential backoff until the per-batch budget
//!   runs out, then its records are dropped and counted
//!
//! The `Uploader` worker consumes batches strictly in order and uploads one
//! at a time, so records reach the backend in stream order.

mod common;
mod document;
mod elastic;
mod metrics;
mod uploader;

pub use common::{DocumentSink, RecordStatus, SinkError, UploadResult};
pub use document::{document, index_name};
pub use elastic::ElasticsearchSink;
pub use metrics::{UploaderMetrics, UploaderMetricsSnapshot};
pub use uploader::{RetryPolicy, Uploader};
