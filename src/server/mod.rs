//! HTTP exposition of the latest sample and the Prometheus registry.

mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::time::Instant;

use crate::core::exporter::PrometheusExporter;
use crate::core::system_monitor::{ShutdownListener, SnapshotStoreRef};
use crate::error::Result;

pub use handlers::{healthz, latest_sample, not_found, prometheus_metrics, readyz};

/// Shared, read-only state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: SnapshotStoreRef,
    pub exporter: Arc<PrometheusExporter>,
}

impl AppState {
    pub fn new(store: SnapshotStoreRef, exporter: Arc<PrometheusExporter>) -> Self {
        Self { store, exporter }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics/latest", get(latest_sample))
        .route("/metrics", get(prometheus_metrics))
        .fallback(not_found)
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

/// Log method, path, status and latency of every request.
async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();

    let response = next.run(request).await;

    log::info!(
        "{} {} {} {:?}",
        method,
        path,
        response.status().as_u16(),
        started.elapsed()
    );
    response
}

/// Serve until `shutdown` fires, then let in-flight requests finish.
pub async fn serve(addr: SocketAddr, state: AppState, shutdown: ShutdownListener) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_listener(listener, state, shutdown).await
}

/// Like [`serve`], on a listener that is already bound.
pub async fn serve_listener(
    listener: TcpListener,
    state: AppState,
    mut shutdown: ShutdownListener,
) -> Result<()> {
    log::info!("HTTP server listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.recv().await })
        .await?;

    log::info!("HTTP server stopped");
    Ok(())
}
