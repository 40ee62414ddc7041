//! Test utilities for the token gateway
//!
//! This crate provides:
//! - Fixed RSA keypairs that sign tokens and publish matching JWKS entries
//! - A builder for Entra ID shaped access-token claims
//! - A mock JWKS endpoint and a harness that spawns a real gateway server

pub mod crypto_fixtures;
pub mod server_harness;
pub mod token_builders;

pub use crypto_fixtures::*;
pub use server_harness::*;
pub use token_builders::*;
