// hostmetrics library - public API

// Re-export error types
pub mod error;
pub use error::{MonitorError, Result};

// Module declarations
pub mod commands;
pub mod core;
pub mod server;

// Re-export commonly used types
pub use crate::core::config::Settings;
pub use crate::core::system_monitor::{MetricKind, Pipeline, PipelineHandle, Sample, ShutdownSignal};

// Initialize logging
pub fn init_logging() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
}
