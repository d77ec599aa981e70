//! Health endpoint handler

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use std::sync::Arc;

/// Error returned by a failing health check
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Zero-argument health check supplied by the daemon
pub type HealthCheck = Arc<dyn Fn() -> Result<(), BoxError> + Send + Sync>;

/// Build the health router
///
/// `GET /` answers `200` with an empty body when the check passes and
/// `500` with the error text when it fails.
pub fn router(healthcheck: HealthCheck) -> Router {
    Router::new()
        .route("/", get(health))
        .with_state(healthcheck)
}

async fn health(State(healthcheck): State<HealthCheck>) -> (StatusCode, String) {
    match healthcheck() {
        Ok(()) => (StatusCode::OK, String::new()),
        Err(e) => {
            tracing::error!(error = %e, "health check failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
