use crate::ServiceInfo;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// GET /health - service identity and status
pub async fn health(State(info): State<ServiceInfo>) -> Response {
    let health = json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "name": info.name,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (StatusCode::OK, Json(health)).into_response()
}

/// GET /live - liveness probe (is the process alive?)
pub async fn liveness() -> Response {
    (StatusCode::OK, "OK").into_response()
}

/// GET /ready - readiness probe, polled by the launcher and the health monitor
pub async fn readiness() -> Response {
    let ready = json!({
        "status": "ready",
        "version": env!("CARGO_PKG_VERSION"),
    });

    (StatusCode::OK, Json(ready)).into_response()
}

/// GET /join - what a pairing device needs to connect
pub async fn join(State(info): State<ServiceInfo>) -> Response {
    let join = json!({
        "name": info.name,
        "version": env!("CARGO_PKG_VERSION"),
        "address": info.address,
    });

    (StatusCode::OK, Json(join)).into_response()
}
