// Core pipeline, configuration and exporters

pub mod config;
pub mod exporter;
pub mod system_monitor;

// Re-export commonly used items
pub use config::{PipelineConfig, ServerConfig, Settings};
pub use exporter::{PrometheusExporter, SampleSink};
pub use system_monitor::{Pipeline, PipelineHandle, Sample, ShutdownSignal, SnapshotStore};
