//! Liveness and readiness probes.

use axum::{extract::State, http::StatusCode};

use crate::AppState;

/// GET /health/live - The process is up.
pub async fn live() -> &'static str {
    "OK"
}

/// GET /health/ready - The store answers.
pub async fn ready(State(state): State<AppState>) -> (StatusCode, &'static str) {
    match state.repo.ping().await {
        Ok(()) => (StatusCode::OK, "Ready"),
        Err(e) => {
            tracing::error!(error = %e, "readiness check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "database not ready")
        }
    }
}
