use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use hostmetrics::core::config::PipelineConfig;
use hostmetrics::core::system_monitor::{
    DiskMetrics, MetricKind, NetworkMetrics, Pipeline, ShutdownSignal, WorkerState,
};

use super::common::{wait_until, RecordingSink, ScriptedProbe};

fn config(collection_ms: u64, sample_ms: u64, capacity: usize) -> PipelineConfig {
    PipelineConfig {
        collection_interval: Duration::from_millis(collection_ms),
        sample_interval: Duration::from_millis(sample_ms),
        mailbox_capacity: capacity,
    }
}

#[tokio::test]
async fn test_sentinel_until_first_publish() {
    let signal = ShutdownSignal::new();
    let handle = Pipeline::new(config(10, 60_000, 8))
        .with_probe(Box::new(ScriptedProbe::new(MetricKind::Cpu)))
        .spawn(&signal);

    tokio::time::sleep(Duration::from_millis(50)).await;
    let sample = handle.latest_sample();
    assert!(sample.timestamp.is_none());
    assert!(!handle.snapshot_store().is_ready());

    let report = handle.shutdown().await;
    assert_eq!(report.aggregator.published, 0);
}

#[tokio::test]
async fn test_unobserved_kinds_are_published_as_zero() {
    let signal = ShutdownSignal::new();
    let handle = Pipeline::new(config(10, 20, 16))
        .with_probe(Box::new(ScriptedProbe::new(MetricKind::Cpu)))
        .with_probe(Box::new(ScriptedProbe::new(MetricKind::Memory)))
        .spawn(&signal);

    let store = handle.snapshot_store();
    let ready = wait_until(Duration::from_secs(5), || {
        let sample = store.latest_sample();
        sample.cpu.overall_percent > 0.0 && sample.memory.total_bytes > 0
    })
    .await;
    assert!(ready);

    let sample = handle.latest_sample();
    assert!(sample.is_ready());
    assert_eq!(sample.disk, DiskMetrics::default());
    assert_eq!(sample.network, NetworkMetrics::default());

    handle.shutdown().await;
}

#[tokio::test]
async fn test_published_timestamps_never_decrease() {
    let sink = Arc::new(RecordingSink::default());
    let signal = ShutdownSignal::new();
    let handle = Pipeline::new(config(5, 5, 32))
        .with_probe(Box::new(ScriptedProbe::new(MetricKind::Disk)))
        .with_probe(Box::new(ScriptedProbe::new(MetricKind::Network)))
        .with_sink(sink.clone())
        .spawn(&signal);

    assert!(wait_until(Duration::from_secs(5), || sink.seen.lock().len() >= 20).await);
    let report = handle.shutdown().await;

    let seen = sink.seen.lock();
    assert!(seen.iter().all(|s| s.timestamp.is_some()));
    assert!(seen.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    assert_eq!(report.aggregator.published as usize, seen.len());
}

#[tokio::test]
async fn test_cancellation_mid_probe_stops_worker() {
    let probe = ScriptedProbe::new(MetricKind::Memory).with_delay(Duration::from_millis(200));
    let calls = probe.calls();

    let signal = ShutdownSignal::new();
    let handle = Pipeline::new(config(10, 10, 4))
        .with_probe(Box::new(probe))
        .spawn(&signal);

    // The first tick fires immediately, so the probe is now blocked inside its call
    assert!(wait_until(Duration::from_secs(5), || calls.load(Ordering::SeqCst) == 1).await);
    signal.trigger();

    let report = handle.join().await;
    let worker = &report.workers[0];

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(worker.state, WorkerState::Stopped);
    assert_eq!(worker.cycles, 1);
    assert_eq!(worker.delivered + worker.rejected, 1);
}

#[tokio::test]
async fn test_slow_consumer_drops_are_counted_not_blocking() {
    let probe = ScriptedProbe::new(MetricKind::Cpu);
    let calls = probe.calls();

    // Aggregator never ticks within the test; it still drains the mailbox
    let signal = ShutdownSignal::new();
    let pipeline = Pipeline::new(config(1, 60_000, 1)).with_probe(Box::new(probe));
    let drops = pipeline.drop_counters();
    let handle = pipeline.spawn(&signal);

    assert!(wait_until(Duration::from_secs(5), || calls.load(Ordering::SeqCst) >= 50).await);
    let report = handle.shutdown().await;

    let worker = &report.workers[0];
    assert_eq!(worker.kind, MetricKind::Cpu);
    assert_eq!(worker.cycles, worker.delivered + worker.rejected);
    // A hand-off racing the aggregator's exit is rejected without a drop count
    assert!(drops.get(MetricKind::Cpu) <= worker.rejected);
    assert!(report.aggregator.received <= worker.delivered);
}

#[tokio::test]
async fn test_shutdown_is_idempotent() {
    let signal = ShutdownSignal::new();
    let handle = Pipeline::new(config(10, 10, 4))
        .with_probe(Box::new(ScriptedProbe::new(MetricKind::Network)))
        .spawn(&signal);

    signal.trigger();
    signal.trigger();
    let report = handle.shutdown().await;

    assert_eq!(report.workers.len(), 1);
    assert!(signal.is_triggered());
}
