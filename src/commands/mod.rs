// Command handlers module
pub mod serve;
pub mod snapshot;

use anyhow::{Context, Result};
use clap::ArgMatches;

use crate::core::config::Settings;

// Re-exports for cleaner imports
pub use serve::execute as serve;
pub use snapshot::execute as snapshot;

/// Multi-threaded runtime shared by the long-running subcommands.
fn build_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .thread_name("hostmetrics-worker")
        .build()
        .context("Failed to build tokio runtime")
}

/// Environment settings with any command-line flags applied on top.
fn settings_from(matches: &ArgMatches) -> Settings {
    apply_flags(Settings::from_env(), matches)
}

/// Command-line flag for each environment key it overrides.
const FLAG_KEYS: [(&str, &str); 5] = [
    ("PORT", "port"),
    ("COLLECTOR_INTERVAL", "collector-interval"),
    ("SAMPLE_INTERVAL", "sample-interval"),
    ("BUFFER_SIZE", "buffer-size"),
    ("COLLECTORS", "collectors"),
];

/// Flags go through the same parsers as the environment: a bad value is
/// logged and the value underneath is kept.
fn apply_flags(settings: Settings, matches: &ArgMatches) -> Settings {
    settings.with_overrides(|key| {
        let (_, flag) = FLAG_KEYS.iter().find(|(env, _)| *env == key)?;
        matches.try_get_one::<String>(flag).ok().flatten().cloned()
    })
}
