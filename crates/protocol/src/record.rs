//! Telemetry records
//!
//! A `TelemetryRecord` is one decoded measurement. Records are created here
//! from notification updates, flow through the batcher unmodified, and are
//! consumed exactly once by the uploader.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use gtel_proto::gnmi;

use crate::error::Result;
use crate::path::DevicePath;
use crate::value::{decode_typed_value, CanonicalValue};

/// One decoded measurement from a device
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryRecord {
    /// Configured device identifier
    pub device: Arc<str>,

    /// Full path (notification prefix + update path)
    pub path: DevicePath,

    /// Device-reported timestamp in nanoseconds since the unix epoch,
    /// falling back to collection time when the device reports none
    pub timestamp_ns: i64,

    /// Decoded value
    pub value: CanonicalValue,

    /// False for records delivered before the initial-dump sync boundary,
    /// true afterwards
    pub sync: bool,
}

/// Decode one update from a notification into a record
///
/// `collected_ns` is the collection-time fallback applied when the device
/// reports a zero timestamp.
pub fn decode_update(
    device: &Arc<str>,
    prefix: Option<&gnmi::Path>,
    update: &gnmi::Update,
    notification_timestamp_ns: i64,
    collected_ns: i64,
    sync: bool,
) -> Result<TelemetryRecord> {
    let path = DevicePath::join_wire(prefix, update.path.as_ref())?;
    let value = match update.val.as_ref() {
        Some(val) => decode_typed_value(val)?,
        None => return Err(crate::error::CodecError::EmptyValue),
    };
    let timestamp_ns = if notification_timestamp_ns != 0 {
        notification_timestamp_ns
    } else {
        collected_ns
    };

    Ok(TelemetryRecord {
        device: Arc::clone(device),
        path,
        timestamp_ns,
        value,
        sync,
    })
}

/// Current wall-clock time in nanoseconds since the unix epoch
pub fn collection_timestamp_ns() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}
