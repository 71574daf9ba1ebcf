//! Host metrics sampling pipeline.
//!
//! Collector workers poll probes for CPU, memory, disk and network, hand the
//! results to a bounded mailbox, and a single aggregator merges the latest
//! measurement of every kind into the sample readers see.

mod collector;
mod mailbox;
mod metrics;
mod probe;
mod runtime;
mod shutdown;
mod snapshot;
pub mod tasks;

pub use collector::{host_probe, CpuProbe, DiskProbe, MemoryProbe, NetworkProbe};
pub use mailbox::{new_mailbox, DropCounters, MailboxReceiver, MailboxSender};
pub use metrics::{
    CpuMetrics, DiskMetrics, Measurement, MemoryMetrics, MetricKind, NetworkMetrics, Payload,
    Sample,
};
pub use probe::Probe;
pub use runtime::{Pipeline, PipelineHandle, PipelineReport};
pub use shutdown::{ShutdownListener, ShutdownSignal};
pub use snapshot::{SnapshotStore, SnapshotStoreRef};
pub use tasks::{
    AggregatorState, AggregatorStats, CollectorWorker, SampleAggregator, WorkerState, WorkerStats,
};
