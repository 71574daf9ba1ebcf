//! Route handlers. Each one only reads the snapshot store or the exporter.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use super::AppState;

pub async fn healthz() -> &'static str {
    "OK"
}

pub async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not found")
}

pub async fn readyz(State(state): State<AppState>) -> (StatusCode, &'static str) {
    if state.store.is_ready() {
        (StatusCode::OK, "Ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Not ready")
    }
}

/// Latest merged sample as JSON, or 503 until the first publish.
pub async fn latest_sample(State(state): State<AppState>) -> Response {
    let sample = state.store.latest_sample();
    if !sample.is_ready() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "No metrics data available yet" })),
        )
            .into_response();
    }

    Json(sample).into_response()
}

pub async fn prometheus_metrics(State(state): State<AppState>) -> Response {
    match state.exporter.render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, state.exporter.content_type())],
            body,
        )
            .into_response(),
        Err(e) => {
            log::error!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
