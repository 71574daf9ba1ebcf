use std::sync::Arc;
use std::time::Duration;

use hostmetrics::core::system_monitor::{
    new_mailbox, AggregatorState, Measurement, MetricKind, NetworkMetrics, SampleAggregator,
    SnapshotStore,
};
use hostmetrics::MonitorError;

use super::common::reading;

#[test]
fn test_full_mailbox_rejects_newest_and_keeps_order() {
    let (tx, mut rx) = new_mailbox(2);

    tx.try_deliver(Measurement::new(reading(MetricKind::Cpu, 1)))
        .unwrap();
    tx.try_deliver(Measurement::new(reading(MetricKind::Memory, 1)))
        .unwrap();

    let rejected = tx.try_deliver(Measurement::new(reading(MetricKind::Disk, 1)));
    assert!(matches!(
        rejected,
        Err(MonitorError::MailboxRejected(MetricKind::Disk))
    ));
    assert_eq!(tx.drop_counters().get(MetricKind::Disk), 1);
    assert_eq!(tx.drop_counters().total(), 1);

    let mut state = AggregatorState::default();
    let first = rx.try_recv().unwrap();
    assert_eq!(first.kind(), MetricKind::Cpu);
    state.apply(first.into_payload());
    let second = rx.try_recv().unwrap();
    assert_eq!(second.kind(), MetricKind::Memory);
    state.apply(second.into_payload());
    assert!(rx.try_recv().is_none());
    assert!(rx.is_empty());

    assert!(state.has_observed(MetricKind::Cpu));
    assert!(state.has_observed(MetricKind::Memory));
    assert!(!state.has_observed(MetricKind::Disk));

    tx.try_deliver(Measurement::new(reading(MetricKind::Network, 1)))
        .unwrap();
}

#[test]
fn test_space_frees_up_after_consumption() {
    let (tx, mut rx) = new_mailbox(1);

    tx.try_deliver(Measurement::new(reading(MetricKind::Network, 1)))
        .unwrap();
    assert!(tx
        .try_deliver(Measurement::new(reading(MetricKind::Network, 2)))
        .is_err());

    assert!(rx.try_recv().is_some());
    tx.try_deliver(Measurement::new(reading(MetricKind::Network, 3)))
        .unwrap();
    assert_eq!(rx.len(), 1);
}

#[test]
fn test_concurrent_producers_never_exceed_capacity() {
    const CAPACITY: usize = 8;
    const PRODUCERS: usize = 32;

    let (tx, rx) = new_mailbox(CAPACITY);
    let barrier = Arc::new(std::sync::Barrier::new(PRODUCERS));

    let handles: Vec<_> = (0..PRODUCERS)
        .map(|i| {
            let tx = tx.clone();
            let barrier = barrier.clone();
            std::thread::spawn(move || {
                let kind = MetricKind::ALL[i % MetricKind::COUNT];
                barrier.wait();
                tx.try_deliver(Measurement::new(reading(kind, i as u64)))
                    .is_ok()
            })
        })
        .collect();

    let accepted = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();

    assert_eq!(accepted, CAPACITY);
    assert_eq!(rx.len(), CAPACITY);
    assert_eq!(tx.drop_counters().total(), (PRODUCERS - CAPACITY) as u64);
}

#[test]
fn test_closed_mailbox_is_reported() {
    let (tx, rx) = new_mailbox(4);
    drop(rx);

    let result = tx.try_deliver(Measurement::new(reading(MetricKind::Cpu, 1)));
    assert!(matches!(result, Err(MonitorError::MailboxClosed)));
    assert_eq!(tx.drop_counters().total(), 0);
}

#[test]
fn test_last_delivered_payload_per_kind_wins() {
    let (tx, rx) = new_mailbox(32);
    let store = Arc::new(SnapshotStore::new());
    let mut aggregator = SampleAggregator::new(rx, store.clone(), Duration::from_secs(1));

    // Interleaved kinds, several readings each, in production order
    let sequence = [
        (MetricKind::Cpu, 1),
        (MetricKind::Memory, 1),
        (MetricKind::Cpu, 2),
        (MetricKind::Disk, 1),
        (MetricKind::Memory, 2),
        (MetricKind::Cpu, 3),
        (MetricKind::Disk, 2),
        (MetricKind::Memory, 3),
        (MetricKind::Disk, 3),
        (MetricKind::Cpu, 4),
    ];
    for (kind, n) in sequence {
        tx.try_deliver(Measurement::new(reading(kind, n))).unwrap();
    }

    assert_eq!(aggregator.apply_pending(), sequence.len());
    let sample = aggregator.publish();

    assert_eq!(sample.cpu.overall_percent, 4.0);
    assert_eq!(sample.memory.used_bytes, 3);
    assert_eq!(sample.disk.used_bytes, 3);
    assert_eq!(sample.network, NetworkMetrics::default());
    assert_eq!(store.latest_sample(), sample);
}
