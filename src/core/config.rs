use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::system_monitor::MetricKind;
use crate::error::{MonitorError, Result};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_COLLECTION_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(250);
pub const DEFAULT_MAILBOX_CAPACITY: usize = 100;

/// Longest accepted collection or sample interval.
pub const MAX_INTERVAL: Duration = Duration::from_secs(24 * 3600);
/// Largest accepted mailbox capacity.
pub const MAX_MAILBOX_CAPACITY: usize = 1 << 20;

/// Timing and sizing of the sampling pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// How often every collector worker polls its probe.
    pub collection_interval: Duration,
    /// How often the aggregator publishes a merged sample.
    pub sample_interval: Duration,
    /// Mailbox capacity; a full mailbox rejects new measurements.
    pub mailbox_capacity: usize,
}

impl PipelineConfig {
    /// Clamp every field into the range the runtime can honour. Values built
    /// by hand skip the parsers, so the pipeline applies this before starting.
    pub fn sanitized(self) -> Self {
        let sanitized = Self {
            collection_interval: clamp_interval(self.collection_interval),
            sample_interval: clamp_interval(self.sample_interval),
            mailbox_capacity: self.mailbox_capacity.clamp(1, MAX_MAILBOX_CAPACITY),
        };
        if sanitized != self {
            log::warn!("Pipeline config {:?} clamped to {:?}", self, sanitized);
        }
        sanitized
    }
}

/// Keep an interval within what tokio timers accept.
pub(crate) fn clamp_interval(interval: Duration) -> Duration {
    interval.clamp(Duration::from_millis(1), MAX_INTERVAL)
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            collection_interval: DEFAULT_COLLECTION_INTERVAL,
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

/// Everything the binary needs to start, resolved from the environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub pipeline: PipelineConfig,
    pub server: ServerConfig,
    pub kinds: Vec<MetricKind>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            server: ServerConfig::default(),
            kinds: MetricKind::ALL.to_vec(),
        }
    }
}

impl Settings {
    /// Read `PORT`, `COLLECTOR_INTERVAL`, `SAMPLE_INTERVAL`, `BUFFER_SIZE`
    /// and `COLLECTORS` from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve settings through `lookup`. Bad values are logged and replaced
    /// by their defaults, so this never fails.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Settings::default().with_overrides(lookup)
    }

    /// Override fields for every key `lookup` knows about. Keys are the
    /// environment variable names. A bad value is logged and the current
    /// value is kept.
    pub fn with_overrides<F>(self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = parse_or(
            "PORT",
            lookup("PORT").as_deref(),
            self.server.port,
            parse_port,
        );
        let collection_interval = parse_or(
            "COLLECTOR_INTERVAL",
            lookup("COLLECTOR_INTERVAL").as_deref(),
            self.pipeline.collection_interval,
            parse_duration,
        );
        let sample_interval = parse_or(
            "SAMPLE_INTERVAL",
            lookup("SAMPLE_INTERVAL").as_deref(),
            self.pipeline.sample_interval,
            parse_duration,
        );
        let mailbox_capacity = parse_or(
            "BUFFER_SIZE",
            lookup("BUFFER_SIZE").as_deref(),
            self.pipeline.mailbox_capacity,
            parse_capacity,
        );
        let kinds = match lookup("COLLECTORS") {
            Some(raw) => parse_kinds(&raw),
            None => self.kinds,
        };

        Settings {
            pipeline: PipelineConfig {
                collection_interval,
                sample_interval,
                mailbox_capacity,
            },
            server: ServerConfig { port },
            kinds,
        }
    }
}

/// Parse `raw` when present, falling back to `fallback` with a warning when
/// it does not parse.
pub fn parse_or<T, P>(name: &str, raw: Option<&str>, fallback: T, parse: P) -> T
where
    T: std::fmt::Debug,
    P: Fn(&str) -> Result<T>,
{
    let Some(raw) = raw else {
        return fallback;
    };

    match parse(raw.trim()) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("Ignoring {}={:?} ({}), using {:?}", name, raw, e, fallback);
            fallback
        }
    }
}

/// Parse a positive duration written as `<n>ms`, `<n>s`, `<n>m` or `<n>h`,
/// at most [`MAX_INTERVAL`].
pub fn parse_duration(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| MonitorError::config(format!("duration '{}' has no unit", raw)))?;
    let (digits, unit) = raw.split_at(split);

    let value: u64 = digits
        .parse()
        .map_err(|_| MonitorError::config(format!("invalid duration '{}'", raw)))?;

    let duration = match unit {
        "ms" => Duration::from_millis(value),
        "s" => Duration::from_secs(value),
        "m" => Duration::from_secs(value.saturating_mul(60)),
        "h" => Duration::from_secs(value.saturating_mul(3600)),
        other => {
            return Err(MonitorError::config(format!(
                "unknown duration unit '{}' in '{}'",
                other, raw
            )))
        }
    };

    if duration.is_zero() {
        return Err(MonitorError::config("duration must be positive"));
    }
    if duration > MAX_INTERVAL {
        return Err(MonitorError::config(format!(
            "duration '{}' is longer than {:?}",
            raw, MAX_INTERVAL
        )));
    }
    Ok(duration)
}

pub fn parse_port(raw: &str) -> Result<u16> {
    raw.parse::<u16>()
        .ok()
        .filter(|port| *port > 0)
        .ok_or_else(|| MonitorError::config(format!("invalid port '{}'", raw)))
}

pub fn parse_capacity(raw: &str) -> Result<usize> {
    raw.parse::<usize>()
        .ok()
        .filter(|n| (1..=MAX_MAILBOX_CAPACITY).contains(n))
        .ok_or_else(|| MonitorError::config(format!("invalid buffer size '{}'", raw)))
}

/// Parse a comma-separated kind list. Unknown names are logged and skipped;
/// an empty result means every kind.
pub fn parse_kinds(raw: &str) -> Vec<MetricKind> {
    let mut kinds = Vec::new();

    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match name.parse::<MetricKind>() {
            Ok(kind) if !kinds.contains(&kind) => kinds.push(kind),
            Ok(_) => {}
            Err(e) => log::warn!("Skipping collector: {}", e),
        }
    }

    if kinds.is_empty() {
        return MetricKind::ALL.to_vec();
    }
    kinds
}
