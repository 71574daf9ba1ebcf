use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::ArgMatches;

use crate::core::config::{parse_duration, parse_or};
use crate::core::system_monitor::{MetricKind, NetworkMetrics, Pipeline, Sample, ShutdownSignal};

const DEFAULT_WAIT: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Run the pipeline once and print the first sample that has every
/// configured kind in it.
pub fn execute(matches: &ArgMatches) -> Result<()> {
    let settings = super::settings_from(matches);
    let wait = parse_or(
        "--wait",
        matches.get_one::<String>("wait").map(String::as_str),
        DEFAULT_WAIT,
        parse_duration,
    );
    let runtime = super::build_runtime()?;

    let sample = runtime.block_on(async move {
        let signal = ShutdownSignal::new();
        let pipeline = Pipeline::new(settings.pipeline)
            .with_host_probes(&settings.kinds)
            .spawn(&signal);

        let store = pipeline.snapshot_store();
        let kinds = settings.kinds.clone();
        let ready = tokio::time::timeout(wait, async move {
            loop {
                let sample = store.latest_sample();
                if is_complete(&sample, &kinds) {
                    return sample;
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        })
        .await;

        let last = pipeline.latest_sample();
        pipeline.shutdown().await;
        ready.or_else(|_| {
            log::warn!("Not every collector reported within {:?}", wait);
            if last.is_ready() {
                Ok(last)
            } else {
                Err(last)
            }
        })
    });

    let Ok(sample) = sample else {
        bail!("No metrics data available after {:?}", wait);
    };

    let json = serde_json::to_string_pretty(&sample).context("Failed to serialize sample")?;
    println!("{}", json);
    Ok(())
}

/// A published sample counts as complete once every requested kind has a
/// non-zero reading. Kinds that were never collected stay all-zero.
fn is_complete(sample: &Sample, kinds: &[MetricKind]) -> bool {
    sample.is_ready()
        && kinds.iter().all(|kind| match kind {
            MetricKind::Cpu => !sample.cpu.per_core_percent.is_empty(),
            MetricKind::Memory => sample.memory.total_bytes > 0,
            MetricKind::Disk => sample.disk.total_bytes > 0,
            MetricKind::Network => sample.network != NetworkMetrics::default(),
        })
}
