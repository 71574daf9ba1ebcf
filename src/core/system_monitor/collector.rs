//! Host probes backed by `sysinfo`.
//!
//! Each probe owns the sysinfo handle it refreshes, so the four kinds can be
//! measured from independent workers without sharing a `System`.

use std::path::Path;

use sysinfo::{CpuRefreshKind, Disks, MemoryRefreshKind, Networks, RefreshKind, System};

use super::metrics::*;
use super::probe::Probe;
use crate::error::{MonitorError, Result};

/// Build the host probe for `kind`.
pub fn host_probe(kind: MetricKind) -> Box<dyn Probe> {
    match kind {
        MetricKind::Cpu => Box::new(CpuProbe::new()),
        MetricKind::Memory => Box::new(MemoryProbe::new()),
        MetricKind::Disk => Box::new(DiskProbe::new()),
        MetricKind::Network => Box::new(NetworkProbe::new()),
    }
}

fn percent(part: u64, total: u64) -> f64 {
    if total > 0 {
        (part as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

pub struct CpuProbe {
    system: System,
}

impl CpuProbe {
    pub fn new() -> Self {
        let refresh_kind =
            RefreshKind::nothing().with_cpu(CpuRefreshKind::nothing().with_cpu_usage());

        Self {
            system: System::new_with_specifics(refresh_kind),
        }
    }
}

impl Default for CpuProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl Probe for CpuProbe {
    fn kind(&self) -> MetricKind {
        MetricKind::Cpu
    }

    fn measure(&mut self) -> Result<Payload> {
        // Usage is a diff between two refreshes
        self.system.refresh_cpu_usage();
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        self.system.refresh_cpu_usage();

        let cpus = self.system.cpus();
        if cpus.is_empty() {
            return Err(MonitorError::probe(MetricKind::Cpu, "no CPUs reported"));
        }

        // Zero on platforms without load averages
        let load = System::load_average();

        Ok(Payload::Cpu(CpuMetrics {
            overall_percent: self.system.global_cpu_usage() as f64,
            per_core_percent: cpus.iter().map(|cpu| cpu.cpu_usage() as f64).collect(),
            load_average: (load.one, load.five, load.fifteen),
        }))
    }
}

pub struct MemoryProbe {
    system: System,
}

impl MemoryProbe {
    pub fn new() -> Self {
        let refresh_kind = RefreshKind::nothing().with_memory(MemoryRefreshKind::everything());

        Self {
            system: System::new_with_specifics(refresh_kind),
        }
    }
}

impl Default for MemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl Probe for MemoryProbe {
    fn kind(&self) -> MetricKind {
        MetricKind::Memory
    }

    fn measure(&mut self) -> Result<Payload> {
        self.system.refresh_memory();

        let total = self.system.total_memory();
        if total == 0 {
            return Err(MonitorError::probe(
                MetricKind::Memory,
                "total memory reported as zero",
            ));
        }

        let used = self.system.used_memory();
        let swap_total = self.system.total_swap();
        let swap_used = self.system.used_swap();

        Ok(Payload::Memory(MemoryMetrics {
            total_bytes: total,
            available_bytes: self.system.available_memory(),
            used_bytes: used,
            used_percent: percent(used, total),
            swap_total_bytes: swap_total,
            swap_used_bytes: swap_used,
            swap_used_percent: percent(swap_used, swap_total),
        }))
    }
}

pub struct DiskProbe {
    disks: Disks,
}

impl DiskProbe {
    pub fn new() -> Self {
        Self {
            disks: Disks::new_with_refreshed_list(),
        }
    }
}

impl Default for DiskProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl Probe for DiskProbe {
    fn kind(&self) -> MetricKind {
        MetricKind::Disk
    }

    fn measure(&mut self) -> Result<Payload> {
        self.disks.refresh(true);

        if self.disks.list().is_empty() {
            return Err(MonitorError::probe(MetricKind::Disk, "no disks found"));
        }

        // Space of the root filesystem, or of every disk when "/" is not mounted
        let root = self
            .disks
            .iter()
            .find(|disk| disk.mount_point() == Path::new("/"));
        let (total, free) = match root {
            Some(disk) => (disk.total_space(), disk.available_space()),
            None => self.disks.iter().fold((0u64, 0u64), |(total, free), disk| {
                (
                    total.saturating_add(disk.total_space()),
                    free.saturating_add(disk.available_space()),
                )
            }),
        };
        let used = total.saturating_sub(free);

        let (read_bytes, write_bytes) =
            self.disks.iter().fold((0u64, 0u64), |(read, write), disk| {
                let usage = disk.usage();
                (
                    read.saturating_add(usage.total_read_bytes),
                    write.saturating_add(usage.total_written_bytes),
                )
            });

        Ok(Payload::Disk(DiskMetrics {
            total_bytes: total,
            free_bytes: free,
            used_bytes: used,
            used_percent: percent(used, total),
            read_bytes,
            write_bytes,
            read_ops: 0, // sysinfo doesn't provide
            write_ops: 0,
        }))
    }
}

pub struct NetworkProbe {
    networks: Networks,
}

impl NetworkProbe {
    pub fn new() -> Self {
        Self {
            networks: Networks::new_with_refreshed_list(),
        }
    }
}

impl Default for NetworkProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl Probe for NetworkProbe {
    fn kind(&self) -> MetricKind {
        MetricKind::Network
    }

    fn measure(&mut self) -> Result<Payload> {
        self.networks.refresh(true);

        if self.networks.is_empty() {
            return Err(MonitorError::probe(
                MetricKind::Network,
                "no network interfaces found",
            ));
        }

        let metrics = self
            .networks
            .values()
            .fold(NetworkMetrics::default(), |acc, data| NetworkMetrics {
                bytes_sent: acc.bytes_sent.saturating_add(data.total_transmitted()),
                bytes_recv: acc.bytes_recv.saturating_add(data.total_received()),
                packets_sent: acc
                    .packets_sent
                    .saturating_add(data.total_packets_transmitted()),
                packets_recv: acc
                    .packets_recv
                    .saturating_add(data.total_packets_received()),
                errors_in: acc
                    .errors_in
                    .saturating_add(data.total_errors_on_received()),
                errors_out: acc
                    .errors_out
                    .saturating_add(data.total_errors_on_transmitted()),
                drops_in: 0, // sysinfo doesn't provide
                drops_out: 0,
            });

        Ok(Payload::Network(metrics))
    }
}
