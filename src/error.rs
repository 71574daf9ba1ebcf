use std::io;
use thiserror::Error;

use crate::core::system_monitor::MetricKind;

/// Error type for the hostmetrics library
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{kind} probe failed: {message}")]
    Probe { kind: MetricKind, message: String },

    #[error("Mailbox full, {0} measurement rejected")]
    MailboxRejected(MetricKind),

    #[error("Mailbox closed: the aggregator is no longer receiving")]
    MailboxClosed,

    #[error("Unknown metric kind: {0}")]
    UnknownKind(String),

    #[error("Exporter error: {0}")]
    Exporter(#[from] prometheus::Error),
}

/// Result type alias for the hostmetrics library
pub type Result<T> = std::result::Result<T, MonitorError>;

impl MonitorError {
    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        MonitorError::Config(msg.into())
    }

    /// Create a probe failure for the given kind
    pub fn probe<S: Into<String>>(kind: MetricKind, msg: S) -> Self {
        MonitorError::Probe {
            kind,
            message: msg.into(),
        }
    }

    pub fn unknown_kind<S: Into<String>>(name: S) -> Self {
        MonitorError::UnknownKind(name.into())
    }

    /// Whether the error only affects the current cycle of a worker.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MonitorError::Probe { .. } | MonitorError::MailboxRejected(_)
        )
    }
}
