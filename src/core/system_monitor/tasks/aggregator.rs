//! Sample aggregator: sole consumer of the mailbox.
//!
//! Keeps the last payload of every kind and, on its own cadence, merges them
//! into a [`Sample`] that is published to the snapshot store and pushed to
//! every registered sink.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};

use super::super::mailbox::MailboxReceiver;
use super::super::metrics::*;
use super::super::shutdown::ShutdownListener;
use super::super::snapshot::SnapshotStoreRef;
use crate::core::config::clamp_interval;
use crate::core::exporter::SampleSink;

/// Last-known payload per kind. Sparse until each kind has been seen once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatorState {
    cpu: Option<CpuMetrics>,
    memory: Option<MemoryMetrics>,
    disk: Option<DiskMetrics>,
    network: Option<NetworkMetrics>,
}

impl AggregatorState {
    /// Overwrite the slot of the payload's kind (last write wins).
    pub fn apply(&mut self, payload: Payload) {
        match payload {
            Payload::Cpu(cpu) => self.cpu = Some(cpu),
            Payload::Memory(memory) => self.memory = Some(memory),
            Payload::Disk(disk) => self.disk = Some(disk),
            Payload::Network(network) => self.network = Some(network),
        }
    }

    pub fn has_observed(&self, kind: MetricKind) -> bool {
        match kind {
            MetricKind::Cpu => self.cpu.is_some(),
            MetricKind::Memory => self.memory.is_some(),
            MetricKind::Disk => self.disk.is_some(),
            MetricKind::Network => self.network.is_some(),
        }
    }

    pub fn cpu(&self) -> Option<&CpuMetrics> {
        self.cpu.as_ref()
    }

    pub fn memory(&self) -> Option<&MemoryMetrics> {
        self.memory.as_ref()
    }

    pub fn disk(&self) -> Option<&DiskMetrics> {
        self.disk.as_ref()
    }

    pub fn network(&self) -> Option<&NetworkMetrics> {
        self.network.as_ref()
    }

    /// Build a sample stamped with `timestamp`; unseen kinds hold zero values.
    pub fn merge(&self, timestamp: DateTime<Utc>) -> Sample {
        Sample {
            timestamp: Some(timestamp),
            cpu: self.cpu.clone().unwrap_or_default(),
            memory: self.memory.clone().unwrap_or_default(),
            disk: self.disk.clone().unwrap_or_default(),
            network: self.network.clone().unwrap_or_default(),
        }
    }
}

/// Counters reported by the aggregator once it has stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregatorStats {
    pub received: u64,
    pub published: u64,
}

pub struct SampleAggregator {
    receiver: MailboxReceiver,
    store: SnapshotStoreRef,
    sinks: Vec<Arc<dyn SampleSink>>,
    sample_interval: Duration,
    state: AggregatorState,
    last_published: Option<DateTime<Utc>>,
    stats: AggregatorStats,
}

impl SampleAggregator {
    pub fn new(
        receiver: MailboxReceiver,
        store: SnapshotStoreRef,
        sample_interval: Duration,
    ) -> Self {
        Self {
            receiver,
            store,
            sinks: Vec::new(),
            sample_interval: clamp_interval(sample_interval),
            state: AggregatorState::default(),
            last_published: None,
            stats: AggregatorStats::default(),
        }
    }

    /// Register an observer notified after every publish.
    pub fn add_sink(&mut self, sink: Arc<dyn SampleSink>) {
        self.sinks.push(sink);
    }

    pub fn state(&self) -> &AggregatorState {
        &self.state
    }

    pub fn stats(&self) -> AggregatorStats {
        self.stats
    }

    /// Fold one measurement into the state.
    pub fn apply(&mut self, measurement: Measurement) {
        self.stats.received += 1;
        log::trace!(
            "{} measurement captured at {} applied",
            measurement.kind(),
            measurement.captured_at()
        );
        self.state.apply(measurement.into_payload());
    }

    /// Apply everything already waiting in the mailbox without blocking.
    pub fn apply_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Some(measurement) = self.receiver.try_recv() {
            self.apply(measurement);
            applied += 1;
        }
        applied
    }

    /// Merge the current state, publish it and notify the sinks.
    pub fn publish(&mut self) -> Sample {
        // Wall-clock steps backwards must not reorder published samples
        let now = match self.last_published {
            Some(last) => Utc::now().max(last),
            None => Utc::now(),
        };
        let sample = self.state.merge(now);

        self.store.publish(sample.clone());
        for sink in &self.sinks {
            sink.observe(&sample);
        }

        self.last_published = Some(now);
        self.stats.published += 1;

        log::debug!(
            "Sample created at {} (CPU: {:.1}%, Memory: {:.1}%, Disk: {:.1}%)",
            now.format("%H:%M:%S%.3f"),
            sample.cpu.overall_percent,
            sample.memory.used_percent,
            sample.disk.used_percent
        );

        sample
    }

    /// Consume measurements and publish samples until the shutdown signal
    /// fires. Whatever is still queued at that point is discarded.
    pub async fn run(mut self, mut shutdown: ShutdownListener) -> AggregatorStats {
        log::info!(
            "Aggregator started with {:?} sample interval",
            self.sample_interval
        );

        // First sample one full interval after start
        let now = Instant::now();
        let start = now.checked_add(self.sample_interval).unwrap_or(now);
        let mut ticker = interval_at(start, self.sample_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.recv() => {
                    log::info!(
                        "Aggregator stopping ({} pending discarded, {} dropped while full)",
                        self.receiver.len(),
                        self.receiver.drop_counters().total()
                    );
                    break;
                }
                _ = ticker.tick() => {
                    self.publish();
                }
                Some(measurement) = self.receiver.recv() => {
                    self.apply(measurement);
                }
            }
        }

        self.stats
    }
}

impl std::fmt::Debug for SampleAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleAggregator")
            .field("sample_interval", &self.sample_interval)
            .field("state", &self.state)
            .field("sinks", &self.sinks.len())
            .field("stats", &self.stats)
            .finish()
    }
}
