//! Bounded hand-off queue between collector workers and the aggregator.
//!
//! Enqueue never waits: when the queue is full the new measurement is
//! rejected and counted, and the queue contents are left untouched.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};

use super::metrics::{Measurement, MetricKind};
use crate::core::config::MAX_MAILBOX_CAPACITY;
use crate::error::{MonitorError, Result};

/// Number of measurements rejected per kind because the mailbox was full.
#[derive(Debug, Default)]
pub struct DropCounters {
    counts: [AtomicU64; MetricKind::COUNT],
}

impl DropCounters {
    fn record(&self, kind: MetricKind) -> u64 {
        self.counts[kind.index()].fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn get(&self, kind: MetricKind) -> u64 {
        self.counts[kind.index()].load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        MetricKind::ALL.iter().map(|kind| self.get(*kind)).sum()
    }
}

/// Create a mailbox holding at most `capacity` measurements.
pub fn new_mailbox(capacity: usize) -> (MailboxSender, MailboxReceiver) {
    // tokio panics on a zero-sized or oversized channel
    let capacity = capacity.clamp(1, MAX_MAILBOX_CAPACITY);
    let (tx, rx) = mpsc::channel(capacity);
    let drops = Arc::new(DropCounters::default());

    (
        MailboxSender {
            tx,
            drops: drops.clone(),
        },
        MailboxReceiver { rx, drops },
    )
}

/// Producer side, cloned into every collector worker.
#[derive(Debug, Clone)]
pub struct MailboxSender {
    tx: mpsc::Sender<Measurement>,
    drops: Arc<DropCounters>,
}

impl MailboxSender {
    /// Hand a measurement over without waiting.
    ///
    /// Returns `MailboxRejected` when the queue is at capacity (the
    /// measurement is dropped) and `MailboxClosed` once the receiver is gone.
    pub fn try_deliver(&self, measurement: Measurement) -> Result<()> {
        let kind = measurement.kind();
        match self.tx.try_send(measurement) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                let dropped = self.drops.record(kind);
                log::warn!(
                    "{} measurement dropped: mailbox full ({} dropped so far)",
                    kind,
                    dropped
                );
                Err(MonitorError::MailboxRejected(kind))
            }
            Err(TrySendError::Closed(_)) => Err(MonitorError::MailboxClosed),
        }
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    pub fn drop_counters(&self) -> Arc<DropCounters> {
        self.drops.clone()
    }
}

/// Consumer side, owned by the aggregator alone.
#[derive(Debug)]
pub struct MailboxReceiver {
    rx: mpsc::Receiver<Measurement>,
    drops: Arc<DropCounters>,
}

impl MailboxReceiver {
    /// Wait for the next measurement. Cancel-safe, so it can sit in a `select!`.
    pub async fn recv(&mut self) -> Option<Measurement> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Measurement> {
        match self.rx.try_recv() {
            Ok(measurement) => Some(measurement),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn drop_counters(&self) -> Arc<DropCounters> {
        self.drops.clone()
    }
}
