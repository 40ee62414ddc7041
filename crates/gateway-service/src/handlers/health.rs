//! Health check handlers.
//!
//! - `/health`: Liveness check - reports the service and whether auth is enforced
//! - `/ready`: Readiness check - verifies the signing keys can be fetched

use crate::models::{HealthResponse, ReadinessResponse, SERVICE_NAME};
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

/// Liveness check handler.
///
/// Does NOT check any dependencies.
///
/// ## Example Response
///
/// ```json
/// {
///   "status": "healthy",
///   "service": "MCP Server",
///   "authentication": "enabled"
/// }
/// ```
#[tracing::instrument(skip_all, name = "gateway.health.check")]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let authentication = if state.auth.enforced() {
        "enabled"
    } else {
        "disabled"
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        authentication: authentication.to_string(),
    })
}

/// Readiness check handler.
///
/// With auth enforced, refetches the JWKS and returns 503 if that fails.
/// With auth disabled there is nothing to check.
///
/// ## Security
///
/// Error messages are intentionally generic to avoid leaking infrastructure details.
/// Actual errors are logged server-side with `tracing::warn!`.
#[tracing::instrument(skip_all, name = "gateway.health.readiness")]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.auth.refresh_keys().await {
        Ok(true) => (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready",
                jwks: "available",
                error: None,
            }),
        ),
        Ok(false) => (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready",
                jwks: "disabled",
                error: None,
            }),
        ),
        Err(e) => {
            tracing::warn!(target: "gateway.health", error = %e, "Readiness check failed: JWKS unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    status: "not_ready",
                    jwks: "unavailable",
                    // Generic error - don't leak infrastructure details
                    error: Some("Service dependencies unavailable".to_string()),
                }),
            )
        }
    }
}
