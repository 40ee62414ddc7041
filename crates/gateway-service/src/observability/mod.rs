//! Observability module for the token gateway.
//!
//! Provides metrics definitions and recording helpers.

pub mod metrics;
