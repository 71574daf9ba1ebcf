use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::ArgMatches;
use prometheus::Registry;

use crate::core::exporter::PrometheusExporter;
use crate::core::system_monitor::{Pipeline, ShutdownSignal};
use crate::server::{self, AppState};

/// Run the pipeline and the HTTP server until Ctrl+C or SIGTERM.
pub fn execute(matches: &ArgMatches) -> Result<()> {
    let settings = super::settings_from(matches);
    let runtime = super::build_runtime()?;

    let signal = ShutdownSignal::new();
    let handler_signal = signal.clone();
    ctrlc::set_handler(move || {
        log::info!("Shutdown requested");
        handler_signal.trigger();
    })
    .map_err(|e| anyhow::anyhow!("Failed to set Ctrl+C handler: {}", e))?;

    runtime.block_on(async move {
        let pipeline = Pipeline::new(settings.pipeline).with_host_probes(&settings.kinds);

        let exporter = PrometheusExporter::new(Registry::new())
            .context("Failed to register Prometheus gauges")?
            .with_drop_counters(pipeline.drop_counters());
        let exporter = Arc::new(exporter);

        let pipeline = pipeline.with_sink(exporter.clone()).spawn(&signal);
        let state = AppState::new(pipeline.snapshot_store(), exporter);

        let addr = SocketAddr::from(([0, 0, 0, 0], settings.server.port));
        let served = server::serve(addr, state, signal.subscribe()).await;

        // Bind failures land here before any signal; stop the pipeline either way
        let report = pipeline.shutdown().await;
        for worker in &report.workers {
            log::info!(
                "{} collector: {} cycles, {} delivered, {} rejected, {} probe failures",
                worker.kind,
                worker.cycles,
                worker.delivered,
                worker.rejected,
                worker.probe_failures
            );
        }
        log::info!(
            "Aggregator: {} measurements received, {} samples published",
            report.aggregator.received,
            report.aggregator.published
        );

        served.context("HTTP server failed")
    })
}
