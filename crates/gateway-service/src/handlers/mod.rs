//! HTTP request handlers for the token gateway.

pub mod health;
pub mod mcp;
pub mod me;
pub mod metrics;

pub use health::{health_check, readiness_check};
pub use mcp::mcp_endpoint;
pub use me::get_me;
pub use metrics::metrics_handler;
