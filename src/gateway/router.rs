//! HTTP router and handlers

use std::sync::Arc;

use axum::{Json, Router, middleware, response::IntoResponse, routing::get};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use super::auth::{RequestGate, client_cert_middleware};

/// Create the router with the built-in downstream handler behind the gate.
pub fn create_router(gate: Arc<RequestGate>) -> Router {
    let downstream = Router::new().fallback(authorized_handler);
    create_router_with(gate, downstream)
}

/// Mount `downstream` behind the gate.
///
/// `/health` stays outside the gate so probes do not need a certificate.
pub fn create_router_with(gate: Arc<RequestGate>, downstream: Router) -> Router {
    let protected = downstream.layer(middleware::from_fn_with_state(gate, client_cert_middleware));

    Router::new()
        .route("/health", get(health_handler))
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CatchPanicLayer::new()),
        )
}

/// GET /health
async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Default downstream stage, reached only after the gate accepted.
async fn authorized_handler() -> impl IntoResponse {
    Json(json!({ "status": "authorized" }))
}
