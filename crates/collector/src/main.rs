//! gtel - gNMI telemetry collector
//!
//! Subscribes to streaming telemetry on the configured devices and bulk
//! uploads decoded measurements to Elasticsearch, one independent pipeline
//! per device.
//!
//! # Usage
//!
//! ```bash
//! gtel --config configs/gtel.toml
//! GTEL_CORE1_PASSWORD=... gtel -c lab.toml -l debug
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use gtel_config::{Config, DeviceConfig};
use gtel_pipeline::{report_loop, PipelineCoordinator};
use gtel_session::{Credentials, GrpcTransport, SubscriptionSpec, TlsSettings};
use gtel_sink::{ElasticsearchSink, RetryPolicy};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// How long a graceful shutdown may drain before pipelines are aborted
const SHUTDOWN_GRACE: Duration = Duration::from_secs(15);

/// gNMI telemetry collector
#[derive(Parser, Debug)]
#[command(name = "gtel")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "configs/gtel.toml")]
    config: PathBuf,

    /// Log filter override (defaults to the config's [log] level)
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::from_file(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    let level = cli.log_level.as_deref().unwrap_or(&config.log.level);
    init_logging(level)?;

    tracing::info!(
        devices = config.devices.len(),
        sink = %config.sink.elasticsearch.url,
        "gtel collector starting"
    );

    let retry = RetryPolicy::from(&config.sink.elasticsearch);
    let mut coordinator = PipelineCoordinator::new();

    for device in &config.devices {
        let spec = build_spec(device).with_context(|| format!("device '{}'", device.name))?;
        let sink = ElasticsearchSink::new(&config.sink.elasticsearch)
            .context("building elasticsearch sink")?;
        coordinator.spawn(spec, GrpcTransport::new(), sink, config.batch, retry);
    }

    if config.metrics.enabled {
        tokio::spawn(report_loop(
            coordinator.observers(),
            config.metrics.interval,
            coordinator.cancel_token(),
        ));
    }

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    tracing::info!("shutdown signal received");

    coordinator.shutdown(SHUTDOWN_GRACE).await;
    Ok(())
}

/// Build the immutable session spec for one configured device
///
/// The password comes from the environment variable the config names; it
/// lives only inside the spec, whose Debug output redacts it.
fn build_spec(device: &DeviceConfig) -> Result<SubscriptionSpec> {
    let password = std::env::var(&device.password_env)
        .with_context(|| format!("reading password from ${}", device.password_env))?;

    let tls = match &device.tls_ca {
        Some(path) => {
            let ca_pem = std::fs::read(path)
                .with_context(|| format!("reading CA certificate {}", path.display()))?;
            Some(TlsSettings {
                ca_pem,
                server_name: device.tls_server_name.clone(),
            })
        }
        None => None,
    };

    Ok(SubscriptionSpec {
        device: device.name.clone(),
        address: device.address.clone(),
        credentials: Credentials {
            username: device.username.clone(),
            password,
        },
        tls,
        paths: device.parsed_paths()?,
        mode: device.parsed_mode()?,
        stream_mode: device.parsed_stream_mode()?,
        sample_interval: device.sample_interval,
        heartbeat_interval: device.heartbeat_interval,
        encoding: device.parsed_encoding()?,
        max_connect_retries: device.max_connect_retries,
    })
}

/// Initialize the tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();

    Ok(())
}
