//! HTTP Server for Health and Metrics Endpoints
//!
//! Small axum sidecar next to the WebSocket listener.

use std::sync::Arc;
use std::time::Instant;

use amity_core::Storage;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::metrics::GatewayMetrics;
use crate::registry::ConnectionRegistry;

/// Shared state for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub metrics: GatewayMetrics,
    pub registry: Arc<ConnectionRegistry>,
    pub storage: Arc<Storage>,
    pub start_time: Instant,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub ready: bool,
    pub storage_ok: bool,
    pub connections: usize,
}

/// Creates the HTTP router with health and metrics endpoints.
pub fn create_router(state: HttpState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/metrics", get(metrics_handler))
        .route("/", get(root_handler))
        .with_state(state)
}

async fn root_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "service": "amity-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": ["/health", "/ready", "/metrics"]
    }))
}

/// Always returns 200 while the process is up.
async fn health_handler(State(state): State<HttpState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

/// Readiness: verifies the database answers a trivial query.
async fn ready_handler(State(state): State<HttpState>) -> impl IntoResponse {
    let storage_ok = state.storage.user_count().is_ok();
    let response = ReadyResponse {
        ready: storage_ok,
        storage_ok,
        connections: state.registry.connection_count(),
    };
    let code = if response.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(response))
}

async fn metrics_handler(State(state): State<HttpState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.gather(),
    )
}
