use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MonitorError;

/// The closed set of resource kinds the pipeline samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Cpu,
    Memory,
    Disk,
    Network,
}

impl MetricKind {
    pub const COUNT: usize = 4;

    pub const ALL: [MetricKind; Self::COUNT] = [
        MetricKind::Cpu,
        MetricKind::Memory,
        MetricKind::Disk,
        MetricKind::Network,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Cpu => "cpu",
            MetricKind::Memory => "memory",
            MetricKind::Disk => "disk",
            MetricKind::Network => "network",
        }
    }

    /// Dense index into per-kind arrays.
    pub(crate) fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(MetricKind::Cpu),
            "memory" | "mem" => Ok(MetricKind::Memory),
            "disk" => Ok(MetricKind::Disk),
            "network" | "net" => Ok(MetricKind::Network),
            other => Err(MonitorError::unknown_kind(other)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuMetrics {
    pub overall_percent: f64,
    pub per_core_percent: Vec<f64>,
    pub load_average: (f64, f64, f64), // 1, 5, 15 min
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryMetrics {
    pub total_bytes: u64,
    pub available_bytes: u64,
    pub used_bytes: u64,
    pub used_percent: f64,
    pub swap_total_bytes: u64,
    pub swap_used_bytes: u64,
    pub swap_used_percent: f64,
}

/// Usage of the root filesystem plus I/O counters summed over every disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskMetrics {
    pub total_bytes: u64,
    pub free_bytes: u64,
    pub used_bytes: u64,
    pub used_percent: f64,
    pub read_bytes: u64,
    pub write_bytes: u64,
    pub read_ops: u64,
    pub write_ops: u64,
}

/// Interface counters summed over every interface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkMetrics {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub packets_sent: u64,
    pub packets_recv: u64,
    pub errors_in: u64,
    pub errors_out: u64,
    pub drops_in: u64,
    pub drops_out: u64,
}

/// Kind-specific data carried by a [`Measurement`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum Payload {
    Cpu(CpuMetrics),
    Memory(MemoryMetrics),
    Disk(DiskMetrics),
    Network(NetworkMetrics),
}

impl Payload {
    pub fn kind(&self) -> MetricKind {
        match self {
            Payload::Cpu(_) => MetricKind::Cpu,
            Payload::Memory(_) => MetricKind::Memory,
            Payload::Disk(_) => MetricKind::Disk,
            Payload::Network(_) => MetricKind::Network,
        }
    }
}

/// One timestamped observation produced by a collector worker.
///
/// Fields are private so a measurement cannot change after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    payload: Payload,
    captured_at: DateTime<Utc>,
}

impl Measurement {
    /// Wrap a payload, stamping it with the current time.
    pub fn new(payload: Payload) -> Self {
        Self::at(payload, Utc::now())
    }

    pub fn at(payload: Payload, captured_at: DateTime<Utc>) -> Self {
        Self {
            payload,
            captured_at,
        }
    }

    pub fn kind(&self) -> MetricKind {
        self.payload.kind()
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn into_payload(self) -> Payload {
        self.payload
    }
}

/// The merged view of the most recent measurement of every kind.
///
/// `Sample::default()` is the "no data yet" sentinel: no timestamp and every
/// payload at its zero value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: Option<DateTime<Utc>>,
    pub cpu: CpuMetrics,
    pub memory: MemoryMetrics,
    pub disk: DiskMetrics,
    pub network: NetworkMetrics,
}

impl Sample {
    /// A sample is usable once the aggregator has stamped it.
    pub fn is_ready(&self) -> bool {
        self.timestamp.is_some()
    }
}
