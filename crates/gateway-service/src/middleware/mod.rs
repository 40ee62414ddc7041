//! Middleware for the token gateway.
//!
//! # Components
//!
//! - `auth` - Authentication gate applied to every route
//! - `http_metrics` - Request metrics, outermost layer

pub mod auth;
pub mod http_metrics;

pub use auth::{require_auth, AuthState, GateMode, GateOutcome};
pub use http_metrics::http_metrics_middleware;
