use crate::{ServiceInfo, health};

use axum::{Router, routing::get};
use tower_http::cors::{Any, CorsLayer};

/// Build the local server router
pub fn build_router(info: ServiceInfo) -> Router {
    Router::new()
        // Health check endpoints
        .route("/health", get(health::health))
        .route("/live", get(health::liveness))
        .route("/ready", get(health::readiness))
        // Pairing
        .route("/join", get(health::join))
        .with_state(info)
        // Paired devices connect from other origins
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}
