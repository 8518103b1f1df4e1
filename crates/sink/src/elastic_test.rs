use super::*;
use gtel_protocol::{CanonicalValue, TelemetryRecord};
use std::sync::Arc;

fn record(n: u64) -> TelemetryRecord {
    TelemetryRecord {
        device: Arc::from("core1"),
        path: "/interfaces/interface[name=eth0]/state/counters/in-octets"
            .parse()
            .unwrap(),
        timestamp_ns: 1_754_350_000_000_000_000 + n as i64,
        value: CanonicalValue::Uint(n),
        sync: true,
    }
}

fn batch(len: usize) -> Batch {
    Batch::from_records((0..len as u64).map(record).collect())
}

fn item(status: u64) -> serde_json::Value {
    serde_json::json!({ "index": { "status": status } })
}

fn item_with_error(status: u64, error_type: &str, reason: &str) -> serde_json::Value {
    serde_json::json!({
        "index": {
            "status": status,
            "error": { "type": error_type, "reason": reason }
        }
    })
}

#[test]
fn test_classify_no_errors_fast_path() {
    let payload = serde_json::json!({ "took": 3, "errors": false, "items": [] });
    let result = classify_bulk_response(&payload, 10);
    assert_eq!(result.accepted_count(), 10);
}

#[test]
fn test_classify_partial_failure() {
    // 8 accepted, 2 rejected: a partially successful bulk write.
    let mut items: Vec<serde_json::Value> = (0..8).map(|_| item(201)).collect();
    items.push(item_with_error(
        400,
        "mapper_parsing_exception",
        "failed to parse field",
    ));
    items.push(item_with_error(400, "mapper_parsing_exception", "bad date"));
    let payload = serde_json::json!({ "errors": true, "items": items });

    let result = classify_bulk_response(&payload, 10);
    assert_eq!(result.accepted_count(), 8);
    assert_eq!(result.rejected_count(), 2);
    assert_eq!(result.retryable_count(), 0);

    let rejected_reason = result
        .statuses()
        .iter()
        .find_map(|s| match s {
            RecordStatus::Rejected(reason) => Some(reason.clone()),
            _ => None,
        })
        .unwrap();
    assert!(rejected_reason.contains("mapper_parsing_exception"));
}

#[test]
fn test_classify_rate_limited_items_are_retryable() {
    let payload = serde_json::json!({
        "errors": true,
        "items": [
            item(201),
            item_with_error(429, "es_rejected_execution_exception", "queue full"),
            item_with_error(503, "unavailable_shards_exception", "primary missing"),
        ]
    });

    let result = classify_bulk_response(&payload, 3);
    assert_eq!(result.accepted_count(), 1);
    assert_eq!(result.retryable_count(), 2);
    assert_eq!(result.rejected_count(), 0);
}

#[test]
fn test_classify_malformed_response_is_retryable() {
    let payload = serde_json::json!({ "unexpected": true });
    let result = classify_bulk_response(&payload, 4);
    assert_eq!(result.retryable_count(), 4);
}

#[test]
fn test_classify_short_item_list() {
    let payload = serde_json::json!({ "errors": true, "items": [item(200)] });
    let result = classify_bulk_response(&payload, 3);
    assert_eq!(result.accepted_count(), 1);
    // Records the backend never reported on must not be silently lost.
    assert_eq!(result.retryable_count(), 2);
}

#[test]
fn test_bulk_body_shape() {
    let config = gtel_config::ElasticsearchConfig::default();
    let sink = ElasticsearchSink::new(&config).unwrap();

    let body = sink.bulk_body(&batch(2)).unwrap();
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(body.ends_with('\n'));

    let action: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    let index = action["index"]["_index"].as_str().unwrap();
    assert!(index.starts_with("interfaces-interface-name-eth0-state-counters-in-octets-gnmi-"));

    let doc: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
    assert_eq!(doc["device"], serde_json::json!("core1"));
    assert_eq!(doc["counters-in-octets"], serde_json::json!(0));
}

#[test]
fn test_bulk_body_honors_prefix() {
    let config = gtel_config::ElasticsearchConfig {
        index_prefix: Some("lab".into()),
        ..Default::default()
    };
    let sink = ElasticsearchSink::new(&config).unwrap();

    let body = sink.bulk_body(&batch(1)).unwrap();
    let action: serde_json::Value = serde_json::from_str(body.lines().next().unwrap()).unwrap();
    assert!(action["index"]["_index"]
        .as_str()
        .unwrap()
        .starts_with("lab-interfaces-"));
}
