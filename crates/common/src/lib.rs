//! Common utilities shared across token gateway crates.

#![warn(clippy::pedantic)]

/// Module for JWT utilities (size limits, unverified inspection, constants)
pub mod jwt;
