//! Elasticsearch bulk sink
//!
//! One `POST /_bulk` per batch with an ndjson body, per-item status
//! classification from the response. The index mapping is owned by the
//! cluster; this sink only produces documents.

use async_trait::async_trait;
use chrono::Utc;
use gtel_config::ElasticsearchConfig;
use gtel_protocol::Batch;
use reqwest::header::CONTENT_TYPE;

use crate::common::{DocumentSink, RecordStatus, SinkError, UploadResult};
use crate::document::{document, index_name};

/// How much response body to keep in error messages
const ERROR_BODY_LIMIT: usize = 512;

/// Elasticsearch storage backend
pub struct ElasticsearchSink {
    client: reqwest::Client,
    url: String,
    index_prefix: Option<String>,
}

impl ElasticsearchSink {
    /// Build a sink from configuration
    pub fn new(config: &ElasticsearchConfig) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            url: config.url.trim_end_matches('/').to_string(),
            index_prefix: config.index_prefix.clone(),
        })
    }

    /// Render the ndjson bulk body for a batch
    fn bulk_body(&self, batch: &Batch) -> Result<String, SinkError> {
        let date = Utc::now().date_naive();
        let mut body = String::with_capacity(batch.len() * 256);

        for record in batch.records() {
            let index = index_name(&record.path, self.index_prefix.as_deref(), date);
            let action = serde_json::json!({ "index": { "_index": index } });
            body.push_str(&serde_json::to_string(&action)?);
            body.push('\n');
            body.push_str(&serde_json::to_string(&document(record))?);
            body.push('\n');
        }

        Ok(body)
    }
}

#[async_trait]
impl DocumentSink for ElasticsearchSink {
    async fn upload(&self, batch: &Batch) -> Result<UploadResult, SinkError> {
        let body = self.bulk_body(batch)?;

        let response = self
            .client
            .post(format!("{}/_bulk", self.url))
            .header(CONTENT_TYPE, "application/x-ndjson")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            body.truncate(ERROR_BODY_LIMIT);
            return Err(SinkError::Status {
                code: status.as_u16(),
                body,
            });
        }

        let payload: serde_json::Value = response.json().await?;
        Ok(classify_bulk_response(&payload, batch.len()))
    }
}

/// Classify a bulk response into per-record statuses
///
/// Per item: 2xx accepted, 429/503 retryable, anything else rejected. A
/// response that cannot be interpreted marks the whole batch retryable
/// rather than guessing.
pub(crate) fn classify_bulk_response(payload: &serde_json::Value, expected: usize) -> UploadResult {
    // Fast path: the backend says nothing failed.
    if payload.get("errors").and_then(|e| e.as_bool()) == Some(false) {
        return UploadResult::all_accepted(expected);
    }

    let Some(items) = payload.get("items").and_then(|i| i.as_array()) else {
        return UploadResult::all_retryable(expected, "malformed bulk response");
    };

    let statuses = (0..expected)
        .map(|i| match items.get(i) {
            Some(item) => classify_item(item),
            None => RecordStatus::Retryable("missing item in bulk response".into()),
        })
        .collect();

    UploadResult::new(statuses)
}

fn classify_item(item: &serde_json::Value) -> RecordStatus {
    let Some(op) = item.get("index").or_else(|| item.get("create")) else {
        return RecordStatus::Retryable("missing operation in bulk item".into());
    };
    let Some(code) = op.get("status").and_then(|s| s.as_u64()) else {
        return RecordStatus::Retryable("missing status in bulk item".into());
    };

    match code {
        200..=299 => RecordStatus::Accepted,
        429 | 503 => RecordStatus::Retryable(item_reason(op, code)),
        _ => RecordStatus::Rejected(item_reason(op, code)),
    }
}

fn item_reason(op: &serde_json::Value, code: u64) -> String {
    let error_type = op
        .pointer("/error/type")
        .and_then(|t| t.as_str())
        .unwrap_or("unknown");
    let reason = op
        .pointer("/error/reason")
        .and_then(|r| r.as_str())
        .unwrap_or("");
    format!("status {code} ({error_type}): {reason}")
}

#[cfg(test)]
#[path = "elastic_test.rs"]
mod elastic_test;
