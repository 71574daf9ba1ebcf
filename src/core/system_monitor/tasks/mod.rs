//! Async tasks of the sampling pipeline.
//!
//! One collector worker per metric kind plus a single aggregator, talking only
//! through the mailbox and the shutdown signal.

mod aggregator;
mod worker;

pub use aggregator::{AggregatorState, AggregatorStats, SampleAggregator};
pub use worker::{CollectorWorker, WorkerState, WorkerStats};
