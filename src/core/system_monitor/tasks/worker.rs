//! Collector worker: one per metric kind.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::time::{interval, Duration, MissedTickBehavior};

use super::super::mailbox::MailboxSender;
use super::super::metrics::{Measurement, MetricKind, Payload};
use super::super::probe::Probe;
use super::super::shutdown::ShutdownListener;
use crate::core::config::clamp_interval;
use crate::error::{MonitorError, Result};

/// Lifecycle of a collector worker.
///
/// `Stopping` is transient: `run` moves straight on to `Stopped` since no
/// in-flight work is drained, so reports only ever show `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

/// Counters reported by a worker once it has stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    pub kind: MetricKind,
    pub state: WorkerState,
    pub cycles: u64,
    pub probe_failures: u64,
    pub delivered: u64,
    pub rejected: u64,
}

impl WorkerStats {
    fn new(kind: MetricKind) -> Self {
        Self {
            kind,
            state: WorkerState::Idle,
            cycles: 0,
            probe_failures: 0,
            delivered: 0,
            rejected: 0,
        }
    }
}

/// Polls one probe on a fixed interval and hands every measurement to the
/// mailbox without ever waiting for the consumer.
pub struct CollectorWorker {
    kind: MetricKind,
    interval: Duration,
    probe: Arc<Mutex<Box<dyn Probe>>>,
    mailbox: MailboxSender,
    stats: WorkerStats,
}

impl CollectorWorker {
    pub fn new(probe: Box<dyn Probe>, interval: Duration, mailbox: MailboxSender) -> Self {
        let kind = probe.kind();
        Self {
            kind,
            interval: clamp_interval(interval),
            probe: Arc::new(Mutex::new(probe)),
            mailbox,
            stats: WorkerStats::new(kind),
        }
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    pub fn state(&self) -> WorkerState {
        self.stats.state
    }

    /// Run until the shutdown signal fires.
    ///
    /// The first collection happens immediately. A tick that is already in
    /// progress when the signal fires finishes its hand-off attempt; the
    /// probe is not called again afterwards.
    pub async fn run(mut self, mut shutdown: ShutdownListener) -> WorkerStats {
        self.stats.state = WorkerState::Running;
        log::info!(
            "{} collector started with interval {:?}",
            self.kind,
            self.interval
        );

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.recv() => {
                    self.stats.state = WorkerState::Stopping;
                    log::info!("{} collector stopping...", self.kind);
                    break;
                }
                _ = ticker.tick() => {
                    self.collect_and_deliver().await;
                }
            }
        }

        self.stats.state = WorkerState::Stopped;
        self.stats
    }

    /// One cycle: probe, stamp, try to hand off.
    async fn collect_and_deliver(&mut self) {
        self.stats.cycles += 1;

        let payload = match self.measure().await {
            Ok(payload) => payload,
            Err(e) => {
                self.stats.probe_failures += 1;
                log::error!("Error collecting {} metrics: {}", self.kind, e);
                return;
            }
        };

        match self.mailbox.try_deliver(Measurement::new(payload)) {
            Ok(()) => self.stats.delivered += 1,
            Err(MonitorError::MailboxRejected(_)) => self.stats.rejected += 1,
            Err(e) => {
                self.stats.rejected += 1;
                log::debug!("{} measurement not delivered: {}", self.kind, e);
            }
        }
    }

    /// Call the probe on the blocking pool so a slow probe stalls only this worker.
    async fn measure(&self) -> Result<Payload> {
        let probe = self.probe.clone();
        let payload = tokio::task::spawn_blocking(move || {
            let mut probe = probe.lock();
            probe.measure()
        })
        .await
        .map_err(|e| MonitorError::probe(self.kind, format!("probe task failed: {}", e)))??;

        if payload.kind() != self.kind {
            return Err(MonitorError::probe(
                self.kind,
                format!("probe returned a {} payload", payload.kind()),
            ));
        }

        Ok(payload)
    }
}

impl std::fmt::Debug for CollectorWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectorWorker")
            .field("kind", &self.kind)
            .field("interval", &self.interval)
            .field("stats", &self.stats)
            .finish()
    }
}
