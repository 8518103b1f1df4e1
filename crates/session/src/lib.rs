//! gtel session - gNMI subscription sessions
//!
//! A `SubscriptionSession` owns one long-lived connection to one device:
//! it negotiates the subscription, consumes the inbound notification
//! stream, decodes updates into `TelemetryRecord`s, and manages
//! reconnect/backoff state.
//!
//! # State machine
//!
//! ```text
//! Connecting ──▶ Subscribed ──sync──▶ Streaming ◀──▶ Degraded
//!     │              │                   │              │
//!     └──────────────┴────── cancel ─────┴──────────────┴──▶ Closed
//! ```
//!
//! # Key Design
//!
//! - **Narrow transport seam**: the session only needs
//!   `open(spec)` / `next_frame()` / `request_poll()` / `close()`; the tonic
//!   implementation and test doubles both fit behind it
//! - **Blocking reads as backpressure**: the session stops reading frames
//!   while the downstream record channel is full, so gRPC flow control
//!   throttles the device instead of gtel dropping data
//! - **Spec preserved across reconnects**: a Degraded session re-subscribes
//!   with the identical `SubscriptionSpec`

mod backoff;
mod error;
mod metrics;
mod session;
mod spec;
mod transport;

pub use backoff::Backoff;
pub use error::{SessionError, TransportError};
pub use metrics::{SessionMetrics, SessionMetricsSnapshot};
pub use session::{SessionState, SubscriptionSession};
pub use spec::{Credentials, SubscriptionSpec, TlsSettings};
pub use transport::{
    build_subscribe_request, Frame, FrameStream, GrpcStream, GrpcTransport, SubscribeTransport,
};
