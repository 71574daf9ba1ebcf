use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use hostmetrics::core::config::PipelineConfig;
use hostmetrics::core::exporter::PrometheusExporter;
use hostmetrics::core::system_monitor::{MetricKind, Pipeline, ShutdownSignal};
use hostmetrics::server::{self, AppState};
use parking_lot::Mutex;
use prometheus::Registry;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use super::common::{wait_until, ScriptedProbe};

/// Keeps every log line so request logging can be checked.
struct CapturingLogger {
    lines: Mutex<Vec<String>>,
}

impl log::Log for CapturingLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::Level::Info
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            self.lines.lock().push(record.args().to_string());
        }
    }

    fn flush(&self) {}
}

fn captured_logs() -> &'static CapturingLogger {
    static LOGGER: OnceLock<&'static CapturingLogger> = OnceLock::new();
    LOGGER.get_or_init(|| {
        let logger: &'static CapturingLogger = Box::leak(Box::new(CapturingLogger {
            lines: Mutex::new(Vec::new()),
        }));
        log::set_logger(logger).unwrap();
        log::set_max_level(log::LevelFilter::Info);
        logger
    })
}

/// Minimal HTTP/1.1 GET returning the status code and body.
async fn get(addr: SocketAddr, path: &str) -> (u16, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        path
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();

    let status = raw
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .unwrap();
    let body = raw
        .split_once("\r\n\r\n")
        .map(|(_, body)| body.to_string())
        .unwrap_or_default();
    (status, body)
}

#[tokio::test]
async fn test_routes_before_and_after_first_sample() {
    let signal = ShutdownSignal::new();
    let pipeline = Pipeline::new(PipelineConfig {
        collection_interval: Duration::from_millis(20),
        sample_interval: Duration::from_millis(300),
        mailbox_capacity: 8,
    })
    .with_probe(Box::new(ScriptedProbe::new(MetricKind::Cpu)))
    .with_probe(Box::new(ScriptedProbe::new(MetricKind::Memory)));

    let exporter = PrometheusExporter::new(Registry::new())
        .unwrap()
        .with_drop_counters(pipeline.drop_counters());
    let exporter = Arc::new(exporter);
    let handle = pipeline.with_sink(exporter.clone()).spawn(&signal);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = AppState::new(handle.snapshot_store(), exporter);
    let server = tokio::spawn(server::serve_listener(listener, state, signal.subscribe()));

    let (status, body) = get(addr, "/healthz").await;
    assert_eq!((status, body.as_str()), (200, "OK"));

    let (status, body) = get(addr, "/metrics/latest").await;
    assert_eq!(status, 503);
    assert!(body.contains("No metrics data available yet"));

    let (status, _) = get(addr, "/readyz").await;
    assert_eq!(status, 503);

    let store = handle.snapshot_store();
    assert!(wait_until(Duration::from_secs(5), || store.is_ready()).await);

    let (status, body) = get(addr, "/readyz").await;
    assert_eq!((status, body.as_str()), (200, "Ready"));

    let (status, body) = get(addr, "/metrics/latest").await;
    assert_eq!(status, 200);
    let sample: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert!(sample["timestamp"].is_string());
    assert_eq!(sample["disk"]["total_bytes"], 0);

    let (status, body) = get(addr, "/metrics").await;
    assert_eq!(status, 200);
    assert!(body.contains("hostmetrics_cpu_usage_percent{type=\"overall\"}"));
    assert!(body.contains("hostmetrics_measurements_dropped_total{kind=\"cpu\"}"));

    signal.trigger();
    server.await.unwrap().unwrap();
    handle.join().await;
}

#[tokio::test]
async fn test_every_request_is_logged() {
    let logs = captured_logs();
    let signal = ShutdownSignal::new();
    let handle = Pipeline::new(PipelineConfig::default()).spawn(&signal);
    let exporter = Arc::new(PrometheusExporter::new(Registry::new()).unwrap());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = AppState::new(handle.snapshot_store(), exporter);
    let server = tokio::spawn(server::serve_listener(listener, state, signal.subscribe()));

    assert_eq!(get(addr, "/healthz").await.0, 200);
    assert_eq!(get(addr, "/no-such-route").await.0, 404);

    signal.trigger();
    server.await.unwrap().unwrap();
    handle.join().await;

    let lines = logs.lines.lock();
    assert!(lines.iter().any(|l| l.starts_with("GET /healthz 200 ")));
    assert!(lines.iter().any(|l| l.starts_with("GET /no-such-route 404 ")));
}
