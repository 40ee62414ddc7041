//! HTTP routes for the token gateway.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::handlers;
use crate::middleware::{http_metrics_middleware, require_auth, AuthState};
use axum::{
    http::header::AUTHORIZATION,
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::iter;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    sensitive_headers::SetSensitiveRequestHeadersLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Request timeout applied to every route.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Auth gate, also used by the readiness check to refresh keys.
    pub auth: Arc<AuthState>,
}

impl AppState {
    /// Build the state, including the key resolver and validator, from configuration.
    pub fn from_config(config: Config) -> Self {
        let auth = Arc::new(AuthState::from_config(&config));
        Self { config, auth }
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - Liveness check
/// - `/ready` - Readiness check (refetches JWKS when auth is enforced)
/// - `/metrics` - Prometheus metrics endpoint
/// - `/me` - Caller identity
/// - `/echo/mcp` - Echo MCP server (JSON-RPC over POST)
///
/// The auth gate wraps the whole router; the configured path allow-list
/// alone decides which of these are public.
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let auth_state = Arc::clone(&state.auth);

    let app_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/me", get(handlers::get_me))
        .nest("/echo", echo_routes())
        .with_state(state);

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Layer order (bottom-to-top execution):
    // 1. require_auth - Gate every path, allow-list first (innermost)
    // 2. TraceLayer - Log request details
    // 3. TimeoutLayer - Timeout the request
    // 4. SetSensitiveRequestHeadersLayer - Keep Authorization out of traces
    // 5. CorsLayer - Answer preflights before the gate sees them
    // 6. http_metrics_middleware - Record ALL responses (outermost)
    app_routes
        .merge(metrics_routes)
        .layer(middleware::from_fn_with_state(auth_state, require_auth))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(SetSensitiveRequestHeadersLayer::new(iter::once(AUTHORIZATION)))
        .layer(cors_layer())
        .layer(middleware::from_fn(http_metrics_middleware))
}

/// The MCP server mounted under `/echo`.
fn echo_routes() -> Router<Arc<AppState>> {
    Router::new().route("/mcp", post(handlers::mcp_endpoint))
}

/// Permissive CORS for browser-based tool clients.
///
/// Credentials are not allowed: browsers refuse them with a wildcard origin.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}
