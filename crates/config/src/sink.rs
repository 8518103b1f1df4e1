//! Sink configuration

use serde::Deserialize;
use std::time::Duration;

/// Storage backend configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Elasticsearch backend
    pub elasticsearch: ElasticsearchConfig,
}

/// Elasticsearch sink configuration
///
/// # Example
///
/// ```toml
/// [sink.elasticsearch]
/// url = "http://es.internal:9200"
/// index_prefix = "lab"
/// retry_attempts = 5
/// retry_base_delay = "1s"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ElasticsearchConfig {
    /// Base URL of the cluster
    /// Default: "http://127.0.0.1:9200"
    pub url: String,

    /// Optional prefix prepended to derived index names
    pub index_prefix: Option<String>,

    /// Per-request timeout
    /// Default: 30s
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Maximum retry attempts per batch before its records are dropped
    /// Default: 5
    pub retry_attempts: u32,

    /// Base delay for exponential retry backoff
    /// Default: 1s
    #[serde(with = "humantime_serde")]
    pub retry_base_delay: Duration,

    /// Cap on the retry backoff delay
    /// Default: 60s
    #[serde(with = "humantime_serde")]
    pub retry_max_delay: Duration,
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:9200".into(),
            index_prefix: None,
            request_timeout: Duration::from_secs(30),
            retry_attempts: 5,
            retry_base_delay: Duration::from_secs(1),
            retry_max_delay: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ElasticsearchConfig::default();
        assert_eq!(config.url, "http://127.0.0.1:9200");
        assert!(config.index_prefix.is_none());
        assert_eq!(config.retry_attempts, 5);
        assert_eq!(config.retry_base_delay, Duration::from_secs(1));
        assert_eq!(config.retry_max_delay, Duration::from_secs(60));
    }

    #[test]
    fn test_deserialize() {
        let toml = r#"
[elasticsearch]
url = "http://es:9200"
index_prefix = "prod"
request_timeout = "10s"
"#;
        let config: SinkConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.elasticsearch.url, "http://es:9200");
        assert_eq!(config.elasticsearch.index_prefix.as_deref(), Some("prod"));
        assert_eq!(
            config.elasticsearch.request_timeout,
            Duration::from_secs(10)
        );
    }
}
