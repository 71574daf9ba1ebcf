//! Exporter sinks fed by the aggregator after every publish.

use std::sync::Arc;

use prometheus::{Encoder, Gauge, GaugeVec, IntGaugeVec, Opts, Registry, TextEncoder};

use crate::core::system_monitor::{DropCounters, MetricKind, Sample};
use crate::error::Result;

/// Passive observer of published samples. Must not block.
pub trait SampleSink: Send + Sync {
    fn observe(&self, sample: &Sample);
}

const NAMESPACE: &str = "hostmetrics";

/// Mirrors every published sample into Prometheus gauges.
///
/// The registry is passed in rather than taken from a global, so the HTTP
/// layer renders exactly what this exporter registered.
pub struct PrometheusExporter {
    registry: Registry,
    drops: Option<Arc<DropCounters>>,

    cpu_usage_percent: GaugeVec,
    cpu_load_average: GaugeVec,

    memory_usage_bytes: GaugeVec,
    memory_usage_percent: Gauge,
    swap_usage_bytes: GaugeVec,
    swap_usage_percent: Gauge,

    disk_usage_bytes: GaugeVec,
    disk_usage_percent: Gauge,
    disk_io_bytes: GaugeVec,
    disk_io_operations: GaugeVec,

    network_bytes: GaugeVec,
    network_packets: GaugeVec,
    network_errors: GaugeVec,
    network_drops: GaugeVec,

    measurements_dropped: IntGaugeVec,
}

fn gauge_vec(registry: &Registry, name: &str, help: &str, label: &str) -> Result<GaugeVec> {
    let gauge = GaugeVec::new(Opts::new(name, help).namespace(NAMESPACE), &[label])?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

fn gauge(registry: &Registry, name: &str, help: &str) -> Result<Gauge> {
    let gauge = Gauge::with_opts(Opts::new(name, help).namespace(NAMESPACE))?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

impl PrometheusExporter {
    /// Register every gauge on `registry`. Fails if the names are taken.
    pub fn new(registry: Registry) -> Result<Self> {
        let measurements_dropped = IntGaugeVec::new(
            Opts::new(
                "measurements_dropped_total",
                "Measurements rejected because the mailbox was full",
            )
            .namespace(NAMESPACE),
            &["kind"],
        )?;
        registry.register(Box::new(measurements_dropped.clone()))?;

        Ok(Self {
            cpu_usage_percent: gauge_vec(
                &registry,
                "cpu_usage_percent",
                "CPU usage percentage",
                "type",
            )?,
            cpu_load_average: gauge_vec(
                &registry,
                "cpu_load_average",
                "CPU load average",
                "period",
            )?,
            memory_usage_bytes: gauge_vec(
                &registry,
                "memory_usage_bytes",
                "Memory usage in bytes",
                "type",
            )?,
            memory_usage_percent: gauge(
                &registry,
                "memory_usage_percent",
                "Memory usage percentage",
            )?,
            swap_usage_bytes: gauge_vec(
                &registry,
                "swap_usage_bytes",
                "Swap usage in bytes",
                "type",
            )?,
            swap_usage_percent: gauge(&registry, "swap_usage_percent", "Swap usage percentage")?,
            disk_usage_bytes: gauge_vec(
                &registry,
                "disk_usage_bytes",
                "Disk usage in bytes",
                "type",
            )?,
            disk_usage_percent: gauge(&registry, "disk_usage_percent", "Disk usage percentage")?,
            disk_io_bytes: gauge_vec(
                &registry,
                "disk_io_bytes_total",
                "Total disk I/O bytes",
                "direction",
            )?,
            disk_io_operations: gauge_vec(
                &registry,
                "disk_io_operations_total",
                "Total disk I/O operations",
                "direction",
            )?,
            network_bytes: gauge_vec(
                &registry,
                "network_bytes_total",
                "Total network bytes",
                "direction",
            )?,
            network_packets: gauge_vec(
                &registry,
                "network_packets_total",
                "Total network packets",
                "direction",
            )?,
            network_errors: gauge_vec(
                &registry,
                "network_errors_total",
                "Total network errors",
                "direction",
            )?,
            network_drops: gauge_vec(
                &registry,
                "network_drops_total",
                "Total network packet drops",
                "direction",
            )?,
            measurements_dropped,
            drops: None,
            registry,
        })
    }

    /// Also export the mailbox drop counters.
    pub fn with_drop_counters(mut self, drops: Arc<DropCounters>) -> Self {
        self.drops = Some(drops);
        self
    }

    /// Encode every registered metric in the text exposition format.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }
}

impl SampleSink for PrometheusExporter {
    fn observe(&self, sample: &Sample) {
        let cpu = &sample.cpu;
        self.cpu_usage_percent
            .with_label_values(&["overall"])
            .set(cpu.overall_percent);
        for (i, core_percent) in cpu.per_core_percent.iter().enumerate() {
            self.cpu_usage_percent
                .with_label_values(&[format!("core_{}", i).as_str()])
                .set(*core_percent);
        }
        let (one, five, fifteen) = cpu.load_average;
        self.cpu_load_average.with_label_values(&["1m"]).set(one);
        self.cpu_load_average.with_label_values(&["5m"]).set(five);
        self.cpu_load_average.with_label_values(&["15m"]).set(fifteen);

        let memory = &sample.memory;
        self.memory_usage_bytes
            .with_label_values(&["total"])
            .set(memory.total_bytes as f64);
        self.memory_usage_bytes
            .with_label_values(&["used"])
            .set(memory.used_bytes as f64);
        self.memory_usage_bytes
            .with_label_values(&["available"])
            .set(memory.available_bytes as f64);
        self.memory_usage_percent.set(memory.used_percent);
        self.swap_usage_bytes
            .with_label_values(&["total"])
            .set(memory.swap_total_bytes as f64);
        self.swap_usage_bytes
            .with_label_values(&["used"])
            .set(memory.swap_used_bytes as f64);
        self.swap_usage_percent.set(memory.swap_used_percent);

        let disk = &sample.disk;
        self.disk_usage_bytes
            .with_label_values(&["total"])
            .set(disk.total_bytes as f64);
        self.disk_usage_bytes
            .with_label_values(&["used"])
            .set(disk.used_bytes as f64);
        self.disk_usage_bytes
            .with_label_values(&["free"])
            .set(disk.free_bytes as f64);
        self.disk_usage_percent.set(disk.used_percent);
        self.disk_io_bytes
            .with_label_values(&["read"])
            .set(disk.read_bytes as f64);
        self.disk_io_bytes
            .with_label_values(&["write"])
            .set(disk.write_bytes as f64);
        self.disk_io_operations
            .with_label_values(&["read"])
            .set(disk.read_ops as f64);
        self.disk_io_operations
            .with_label_values(&["write"])
            .set(disk.write_ops as f64);

        let network = &sample.network;
        self.network_bytes
            .with_label_values(&["sent"])
            .set(network.bytes_sent as f64);
        self.network_bytes
            .with_label_values(&["received"])
            .set(network.bytes_recv as f64);
        self.network_packets
            .with_label_values(&["sent"])
            .set(network.packets_sent as f64);
        self.network_packets
            .with_label_values(&["received"])
            .set(network.packets_recv as f64);
        self.network_errors
            .with_label_values(&["in"])
            .set(network.errors_in as f64);
        self.network_errors
            .with_label_values(&["out"])
            .set(network.errors_out as f64);
        self.network_drops
            .with_label_values(&["in"])
            .set(network.drops_in as f64);
        self.network_drops
            .with_label_values(&["out"])
            .set(network.drops_out as f64);

        if let Some(drops) = &self.drops {
            for kind in MetricKind::ALL {
                self.measurements_dropped
                    .with_label_values(&[kind.as_str()])
                    .set(drops.get(kind) as i64);
            }
        }
    }
}
