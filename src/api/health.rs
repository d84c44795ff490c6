//! Liveness and readiness checks

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

impl HealthResponse {
    fn new(status: &'static str) -> Json<Self> {
        Json(Self {
            status,
            version: env!("CARGO_PKG_VERSION"),
        })
    }
}

/// Process is up
pub async fn health_check() -> Json<HealthResponse> {
    HealthResponse::new("healthy")
}

/// Process can reach PostgreSQL; 503 otherwise
pub async fn readiness_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    match state.services.repository.ping().await {
        Ok(()) => (StatusCode::OK, HealthResponse::new("ready")),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (StatusCode::SERVICE_UNAVAILABLE, HealthResponse::new("unavailable"))
        }
    }
}
