use std::sync::Arc;
use std::time::Duration;

use gtel_protocol::CanonicalValue;
use tokio::sync::mpsc;
use tokio::time::Instant;

use super::*;

fn record(n: i64) -> TelemetryRecord {
    TelemetryRecord {
        device: Arc::from("core1"),
        path: "/system/state/uptime".parse().unwrap(),
        timestamp_ns: n,
        value: CanonicalValue::Int(n),
        sync: false,
    }
}

fn config(max_records: usize, max_age: Duration) -> BatchConfig {
    BatchConfig {
        max_records,
        max_age,
        in_flight_limit: 4,
    }
}

fn spawn_batcher(
    config: BatchConfig,
) -> (
    mpsc::Sender<TelemetryRecord>,
    mpsc::Receiver<Batch>,
    Arc<BatcherMetrics>,
) {
    let (record_tx, record_rx) = mpsc::channel(64);
    let (batch_tx, batch_rx) = mpsc::channel(config.in_flight_limit);
    let batcher = RecordBatcher::new("core1", record_rx, batch_tx, config);
    let metrics = batcher.metrics();
    tokio::spawn(batcher.run());
    (record_tx, batch_rx, metrics)
}

#[tokio::test(start_paused = true)]
async fn test_seal_by_count() {
    let (tx, mut rx, metrics) = spawn_batcher(config(3, Duration::from_secs(60)));

    for n in 0..6 {
        tx.send(record(n)).await.unwrap();
    }

    let first = rx.recv().await.unwrap();
    let second = rx.recv().await.unwrap();
    // Batches sealed by count are exactly full.
    assert_eq!(first.len(), 3);
    assert_eq!(second.len(), 3);

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.batches_sealed_by_count, 2);
    assert_eq!(snapshot.batches_sealed_by_age, 0);
}

#[tokio::test(start_paused = true)]
async fn test_seal_by_age() {
    // 50 records arrive quickly, then nothing: the batch must seal at the
    // age mark with exactly those 50.
    let (tx, mut rx, metrics) = spawn_batcher(config(100, Duration::from_secs(5)));

    let started = Instant::now();
    for n in 0..50 {
        tx.send(record(n)).await.unwrap();
    }

    let batch = rx.recv().await.unwrap();
    assert_eq!(batch.len(), 50);
    assert!(started.elapsed() >= Duration::from_secs(5));

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.batches_sealed_by_age, 1);
    assert_eq!(snapshot.batches_sealed_by_count, 0);
}

#[tokio::test(start_paused = true)]
async fn test_age_deadline_starts_at_first_record() {
    let (tx, mut rx, _metrics) = spawn_batcher(config(100, Duration::from_secs(5)));

    // Idle time before the first record must not count toward the age.
    tokio::time::sleep(Duration::from_secs(30)).await;
    let started = Instant::now();
    tx.send(record(0)).await.unwrap();

    let batch = rx.recv().await.unwrap();
    assert_eq!(batch.len(), 1);
    let waited = started.elapsed();
    assert!(waited >= Duration::from_secs(5));
    assert!(waited < Duration::from_secs(6));
}

#[tokio::test(start_paused = true)]
async fn test_partial_batch_flushes_on_close() {
    let (tx, mut rx, metrics) = spawn_batcher(config(100, Duration::from_secs(60)));

    for n in 0..3 {
        tx.send(record(n)).await.unwrap();
    }
    drop(tx);

    let batch = rx.recv().await.unwrap();
    assert_eq!(batch.len(), 3);
    assert_eq!(metrics.snapshot().batches_sealed_on_close, 1);

    // Channel closes after the drain.
    assert!(rx.recv().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_order_preserved_across_batches() {
    let (tx, mut rx, _metrics) = spawn_batcher(config(4, Duration::from_secs(60)));

    for n in 0..10 {
        tx.send(record(n)).await.unwrap();
    }
    drop(tx);

    let mut stamps = Vec::new();
    while let Some(batch) = rx.recv().await {
        stamps.extend(batch.records().iter().map(|r| r.timestamp_ns));
    }
    assert_eq!(stamps, (0..10).collect::<Vec<i64>>());
}

#[tokio::test(start_paused = true)]
async fn test_count_seal_disarms_age_timer() {
    let (tx, mut rx, metrics) = spawn_batcher(config(2, Duration::from_secs(5)));

    tx.send(record(0)).await.unwrap();
    tx.send(record(1)).await.unwrap();

    let batch = rx.recv().await.unwrap();
    assert_eq!(batch.len(), 2);

    // Let the old deadline pass with nothing buffered: no empty batch may
    // appear.
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(rx.try_recv().is_err());
    assert_eq!(metrics.snapshot().batches_sealed_by_age, 0);
}
