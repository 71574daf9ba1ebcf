//! Holder of the single most recent [`Sample`].

use std::sync::Arc;

use parking_lot::RwLock;

use super::metrics::Sample;

/// A reference-counted reference to a [`SnapshotStore`].
pub type SnapshotStoreRef = Arc<SnapshotStore>;

/// Many readers, one writer (the aggregator). Readers always get their own
/// copy, so a later publish never races with data a reader already holds.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    latest: RwLock<Sample>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the latest sample; the "no data yet" sentinel before the first publish.
    pub fn latest_sample(&self) -> Sample {
        self.latest.read().clone()
    }

    /// Whether a usable sample has been published yet.
    pub fn is_ready(&self) -> bool {
        self.latest.read().is_ready()
    }

    pub(crate) fn publish(&self, sample: Sample) {
        *self.latest.write() = sample;
    }
}
