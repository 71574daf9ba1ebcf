//! Wiring of collector workers, mailbox, aggregator and snapshot store.
//!
//! Tasks never reference each other directly: workers only hold the mailbox
//! producer handle and a shutdown listener, the aggregator only holds the
//! consumer side and the snapshot store.

use std::sync::Arc;

use tokio::task::JoinHandle;

use super::collector::host_probe;
use super::mailbox::{new_mailbox, DropCounters, MailboxSender};
use super::metrics::{MetricKind, Sample};
use super::probe::Probe;
use super::shutdown::ShutdownSignal;
use super::snapshot::{SnapshotStore, SnapshotStoreRef};
use super::tasks::{AggregatorStats, CollectorWorker, SampleAggregator, WorkerStats};
use crate::core::config::PipelineConfig;
use crate::core::exporter::SampleSink;

/// A pipeline that has been assembled but not started.
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    store: SnapshotStoreRef,
    producer: MailboxSender,
    aggregator: SampleAggregator,
    workers: Vec<CollectorWorker>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let config = config.sanitized();
        let (producer, receiver) = new_mailbox(config.mailbox_capacity);
        let store = Arc::new(SnapshotStore::new());
        let aggregator = SampleAggregator::new(receiver, store.clone(), config.sample_interval);

        Self {
            config,
            store,
            producer,
            aggregator,
            workers: Vec::new(),
        }
    }

    /// Add a collector worker polling `probe` at the configured interval.
    pub fn with_probe(mut self, probe: Box<dyn Probe>) -> Self {
        let worker =
            CollectorWorker::new(probe, self.config.collection_interval, self.producer.clone());
        self.workers.push(worker);
        self
    }

    /// Add one host-backed worker per kind.
    pub fn with_host_probes(self, kinds: &[MetricKind]) -> Self {
        kinds
            .iter()
            .fold(self, |pipeline, kind| pipeline.with_probe(host_probe(*kind)))
    }

    pub fn with_sink(mut self, sink: Arc<dyn SampleSink>) -> Self {
        self.aggregator.add_sink(sink);
        self
    }

    pub fn snapshot_store(&self) -> SnapshotStoreRef {
        self.store.clone()
    }

    pub fn latest_sample(&self) -> Sample {
        self.store.latest_sample()
    }

    /// Producer handle for additional workers. Meant for the wiring layer only.
    pub fn mailbox_producer_handle(&self) -> MailboxSender {
        self.producer.clone()
    }

    pub fn drop_counters(&self) -> Arc<DropCounters> {
        self.producer.drop_counters()
    }

    /// Start the aggregator and every worker on the current tokio runtime.
    pub fn spawn(self, shutdown: &ShutdownSignal) -> PipelineHandle {
        let Pipeline {
            config,
            store,
            producer,
            aggregator,
            workers,
        } = self;

        log::info!(
            "Starting pipeline: {} collectors every {:?}, sample interval {:?}, mailbox capacity {}",
            workers.len(),
            config.collection_interval,
            config.sample_interval,
            producer.capacity()
        );

        let aggregator = tokio::spawn(aggregator.run(shutdown.subscribe()));
        let workers = workers
            .into_iter()
            .map(|worker| tokio::spawn(worker.run(shutdown.subscribe())))
            .collect();

        PipelineHandle {
            signal: shutdown.clone(),
            store,
            drops: producer.drop_counters(),
            aggregator,
            workers,
        }
    }
}

/// What every task reported when it stopped.
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub aggregator: AggregatorStats,
    pub workers: Vec<WorkerStats>,
}

/// Handle to a running pipeline.
#[derive(Debug)]
pub struct PipelineHandle {
    signal: ShutdownSignal,
    store: SnapshotStoreRef,
    drops: Arc<DropCounters>,
    aggregator: JoinHandle<AggregatorStats>,
    workers: Vec<JoinHandle<WorkerStats>>,
}

impl PipelineHandle {
    pub fn latest_sample(&self) -> Sample {
        self.store.latest_sample()
    }

    pub fn snapshot_store(&self) -> SnapshotStoreRef {
        self.store.clone()
    }

    pub fn drop_counters(&self) -> Arc<DropCounters> {
        self.drops.clone()
    }

    /// Fire the cancellation signal and wait for every task to stop.
    pub async fn shutdown(self) -> PipelineReport {
        self.signal.trigger();
        self.join().await
    }

    /// Wait for every task to stop. Returns only once the signal has fired.
    pub async fn join(self) -> PipelineReport {
        let aggregator = match self.aggregator.await {
            Ok(stats) => stats,
            Err(e) => {
                log::error!("Aggregator task failed: {}", e);
                AggregatorStats::default()
            }
        };

        let mut workers = Vec::with_capacity(self.workers.len());
        for handle in self.workers {
            match handle.await {
                Ok(stats) => workers.push(stats),
                Err(e) => log::error!("Collector task failed: {}", e),
            }
        }

        log::info!("Pipeline stopped");
        PipelineReport {
            aggregator,
            workers,
        }
    }
}
