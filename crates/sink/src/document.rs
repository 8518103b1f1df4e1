//! Document shaping
//!
//! Each TelemetryRecord maps 1:1 onto an Elasticsearch document: timestamp
//! in milliseconds, device id, path string, the flattened path keys, and
//! the value under a field named after the last two path elements. The
//! index name is derived from the path plus a date suffix; the index
//! mapping itself is the backend's business, not ours.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use gtel_protocol::{DevicePath, TelemetryRecord};

/// Hard limit Elasticsearch places on index names
const MAX_INDEX_BYTES: usize = 255;

/// Derive the index name for a path
///
/// The path is lowercased, separators and key brackets become dashes, and a
/// `-gnmi-YYYY.MM.DD` suffix is appended. Over-long names lose trailing
/// dash-segments until the suffix fits.
pub fn index_name(path: &DevicePath, prefix: Option<&str>, date: NaiveDate) -> String {
    let mut base = String::new();
    if let Some(prefix) = prefix {
        base.push_str(&prefix.to_ascii_lowercase());
        base.push('-');
    }

    let sanitized: String = path
        .to_string()
        .to_ascii_lowercase()
        .replace(['/', ':', '[', '='], "-")
        .replace([']', '"', '\''], "");
    base.push_str(sanitized.trim_matches('-'));

    // Collapse runs introduced by adjacent separators
    while base.contains("--") {
        base = base.replace("--", "-");
    }

    let suffix = format!("-gnmi-{}", date.format("%Y.%m.%d"));
    while base.len() + suffix.len() > MAX_INDEX_BYTES {
        match base.rsplit_once('-') {
            Some((head, _)) => base = head.to_string(),
            None => {
                base.truncate(MAX_INDEX_BYTES - suffix.len());
                break;
            }
        }
    }

    format!("{base}{suffix}")
}

/// Render a record as its upload document
pub fn document(record: &TelemetryRecord) -> serde_json::Value {
    let mut keys = BTreeMap::new();
    for elem in record.path.elems() {
        for (k, v) in &elem.keys {
            keys.insert(k.clone(), v.clone());
        }
    }

    let mut doc = serde_json::Map::new();
    doc.insert(
        "@timestamp".into(),
        serde_json::Value::from(record.timestamp_ns / 1_000_000),
    );
    doc.insert(
        "device".into(),
        serde_json::Value::String(record.device.to_string()),
    );
    doc.insert(
        "path".into(),
        serde_json::Value::String(record.path.to_string()),
    );
    if !keys.is_empty() {
        doc.insert(
            "keys".into(),
            serde_json::Value::Object(
                keys.into_iter()
                    .map(|(k, v)| (k, serde_json::Value::String(v)))
                    .collect(),
            ),
        );
    }
    doc.insert(leaf_field(&record.path), record.value.to_json());
    doc.insert("sync".into(), serde_json::Value::Bool(record.sync));

    serde_json::Value::Object(doc)
}

/// Field name for the value: the last two path elements joined with a dash
fn leaf_field(path: &DevicePath) -> String {
    let elems = path.elems();
    match elems {
        [] => "value".to_string(),
        [only] => only.name.clone(),
        [.., parent, leaf] => format!("{}-{}", parent.name, leaf.name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gtel_protocol::CanonicalValue;
    use std::sync::Arc;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 5).unwrap()
    }

    fn record(path: &str) -> TelemetryRecord {
        TelemetryRecord {
            device: Arc::from("core1"),
            path: path.parse().unwrap(),
            timestamp_ns: 1_754_350_000_123_456_789,
            value: CanonicalValue::Uint(42),
            sync: true,
        }
    }

    #[test]
    fn test_index_name() {
        let path: DevicePath = "/interfaces/interface[name=Gi0/0/0]/state/counters"
            .parse()
            .unwrap();
        assert_eq!(
            index_name(&path, None, date()),
            "interfaces-interface-name-gi0-0-0-state-counters-gnmi-2026.08.05"
        );
    }

    #[test]
    fn test_index_name_with_prefix_and_origin() {
        let path: DevicePath = "openconfig:/system/state".parse().unwrap();
        assert_eq!(
            index_name(&path, Some("Lab"), date()),
            "lab-openconfig-system-state-gnmi-2026.08.05"
        );
    }

    #[test]
    fn test_index_name_truncates_long_paths() {
        let long = format!("/{}", vec!["segment"; 60].join("/"));
        let path: DevicePath = long.parse().unwrap();
        let name = index_name(&path, None, date());
        assert!(name.len() <= MAX_INDEX_BYTES);
        assert!(name.ends_with("-gnmi-2026.08.05"));
        // Truncation removes whole segments, never mid-word garbage.
        assert!(!name.contains("--"));
    }

    #[test]
    fn test_document_shape() {
        let record = record("/interfaces/interface[name=Gi0/0/0]/state/counters");
        let doc = document(&record);

        assert_eq!(doc["@timestamp"], serde_json::json!(1_754_350_000_123i64));
        assert_eq!(doc["device"], serde_json::json!("core1"));
        assert_eq!(
            doc["path"],
            serde_json::json!("/interfaces/interface[name=Gi0/0/0]/state/counters")
        );
        assert_eq!(doc["keys"]["name"], serde_json::json!("Gi0/0/0"));
        assert_eq!(doc["state-counters"], serde_json::json!(42));
        assert_eq!(doc["sync"], serde_json::json!(true));
    }

    #[test]
    fn test_document_single_element_path() {
        let record = record("/hostname");
        let doc = document(&record);
        assert_eq!(doc["hostname"], serde_json::json!(42));
        assert!(doc.get("keys").is_none());
    }
}
