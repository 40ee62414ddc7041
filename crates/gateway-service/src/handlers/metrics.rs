//! Prometheus metrics endpoint handler.
//!
//! # Security
//!
//! This endpoint is on the default auth allow-list so Prometheus can scrape
//! it. Labels carry no token contents or identities.

use axum::{extract::State, response::IntoResponse};
use metrics_exporter_prometheus::PrometheusHandle;

/// Handler for GET /metrics
///
/// Returns Prometheus text exposition format:
/// ```text
/// # TYPE gateway_token_validations_total counter
/// gateway_token_validations_total{outcome="valid"} 42
/// ```
#[tracing::instrument(skip_all, name = "gateway.metrics.scrape")]
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}
