//! Observability HTTP Routes
//!
//! Health check reporting the replication session state.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;

use crate::replication::Replicator;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub replication: String,
}

/// Health check route
pub fn health_routes(replicator: Replicator) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(replicator)
}

/// Health check handler
async fn health_handler(State(replicator): State<Replicator>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        replication: replicator.state().to_string(),
    };

    (StatusCode::OK, Json(response))
}
