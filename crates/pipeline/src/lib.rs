//! gtel pipeline - batching, backpressure, and supervision
//!
//! One pipeline per device, a producer/consumer chain over bounded
//! channels:
//!
//! ```text
//! SubscriptionSession ──records──▶ RecordBatcher ──batches──▶ Uploader
//!        (gtel-session)                                    (gtel-sink)
//! ```
//!
//! # Key Design
//!
//! - **Bounded everywhere**: the sealed-batch channel's capacity is the
//!   in-flight limit; when the uploader falls behind, the batcher blocks,
//!   the record channel fills, and the session stops reading frames. That
//!   chain is the backpressure mechanism - no data is dropped to keep up
//! - **Order preserved per device**: single-task stages and sequential
//!   uploads mean records reach the backend in stream order
//! - **Failure isolation**: a device whose session dies takes down only its
//!   own pipeline; siblings keep running
//! - **Cooperative shutdown**: cancellation stops the session, the channels
//!   drain, the partial batch flushes; a grace timeout forces abort and
//!   counts abandoned records as dropped

mod batcher;
mod coordinator;
mod metrics;

pub use batcher::RecordBatcher;
pub use coordinator::{
    report_loop, PipelineCoordinator, PipelineObserver, PipelineSnapshot,
};
pub use metrics::{BatcherMetrics, BatcherMetricsSnapshot};

// Re-export key types from dependencies for convenience
pub use gtel_protocol::{Batch, TelemetryRecord};

/// Buffer size of the session → batcher record channel
pub const RECORD_QUEUE_SIZE: usize = 1024;
