//! Health check handler.

use crate::models::HealthResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;
use tracing::instrument;

/// Health check handler.
///
/// Pings the database and reports the result. Always responds 200 so the
/// body is visible to probes; `status` carries the verdict.
///
/// ```json
/// {
///   "status": "healthy",
///   "database": "healthy"
/// }
/// ```
#[instrument(skip_all, name = "drinks.health.check")]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let status = match state.repository.ping().await {
        Ok(()) => "healthy",
        Err(e) => {
            tracing::warn!(target: "drinks.handlers.health", error = %e, "Database ping failed");
            "unhealthy"
        }
    };

    Json(HealthResponse {
        status: status.to_string(),
        database: status.to_string(),
    })
}
