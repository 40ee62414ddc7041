//! Token Gateway Service Library
//!
//! An HTTP gateway that admits requests only when they carry a valid OAuth
//! 2.1 bearer token issued by Microsoft Entra ID.
//!
//! # Architecture
//!
//! ```text
//! request -> middleware::auth (allow-list -> bearer extraction)
//!         -> auth::jwt (inspection -> signature -> exp/nbf -> aud -> iss)
//!         -> auth::jwks (cached key set, refresh on miss)
//!         -> handlers/*.rs with Claims in request extensions
//! ```
//!
//! # Modules
//!
//! - `auth` - Key resolver, token validator and claims
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `mcp` - Echo MCP server behind the gate
//! - `middleware` - Auth gate and HTTP metrics
//! - `models` - Request and response bodies
//! - `observability` - Metrics definitions
//! - `routes` - Axum router setup

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod mcp;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;
