//! gtel protocol - gNMI path/value codec and record types
//!
//! The data model that flows through the pipeline:
//!
//! ```text
//! gnmi::Notification ──decode──▶ TelemetryRecord ──accumulate──▶ Batch
//!        │                           │
//!        │ prefix + update path      │ device, path, timestamp,
//!        ▼                           ▼ canonical value, sync flag
//!    DevicePath                 CanonicalValue
//! ```
//!
//! # Key Design
//!
//! - **Lossless paths**: `DevicePath` round-trips to/from its string form;
//!   equal paths render identical strings (keys are kept ordered)
//! - **Tagged values**: `CanonicalValue` covers every gNMI TypedValue
//!   variant plus nested JSON structures, without falling back to untyped
//!   blobs
//! - **Recoverable decoding**: a malformed update yields a `CodecError`
//!   carrying the raw payload; the stream is never torn down for one bad
//!   update

mod batch;
mod error;
mod mode;
mod path;
mod record;
mod value;

pub use batch::Batch;
pub use error::{CodecError, Result};
pub use mode::{StreamMode, SubscribeMode};
pub use path::{DevicePath, PathElem};
pub use record::{collection_timestamp_ns, decode_update, TelemetryRecord};
pub use value::{decode_typed_value, CanonicalValue, Encoding};

// Re-export the wire types for consumers that touch raw frames
pub use gtel_proto::gnmi;
