//! JWT utilities shared across token gateway crates.
//!
//! This module provides the parts of token handling that do not need a
//! signing key:
//! - Size limits for DoS prevention
//! - Clock skew bounds for `exp`/`nbf` leeway configuration
//! - Single-pass, unverified inspection of the JWT header and payload
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Nothing returned by [`inspect_token`] is trustworthy until the
//!   signature has been verified; it is only used to pick a key and to
//!   enrich diagnostics
//! - Error messages are generic and never echo token contents
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::inspect_token;
//!
//! let unverified = inspect_token(token)?;
//! let key = jwks_client.get_key(unverified.kid.as_deref().unwrap_or_default()).await?;
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// JWTs larger than this size are rejected BEFORE any base64 decoding or
/// cryptographic operation. Entra ID access tokens are typically 1-2KB even
/// with group and role claims.
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Default leeway applied to `exp` and `nbf` checks.
///
/// Zero: no leeway unless an operator configures one explicitly.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(0);

/// Maximum allowed JWT clock skew tolerance (10 minutes).
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while inspecting an unverified JWT.
///
/// Detailed information is logged at debug level for troubleshooting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtInspectionError {
    /// Token is empty.
    #[error("The access token is empty")]
    Empty,

    /// Token size exceeds maximum allowed.
    #[error("The access token exceeds the maximum allowed size")]
    TokenTooLarge,

    /// Token format is invalid (not a valid JWT structure).
    #[error("The access token is not a well-formed JWT")]
    MalformedToken,
}

// =============================================================================
// Types
// =============================================================================

/// The header and payload fields read from a token before verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnverifiedToken {
    /// Key ID from the header, `None` when absent, non-string or empty.
    pub kid: Option<String>,

    /// Algorithm asserted by the header (`alg`).
    pub alg: String,

    /// Issuer (`iss`) from the payload, when present as a string.
    pub issuer: Option<String>,
}

// =============================================================================
// Functions
// =============================================================================

/// Inspect a JWT without verifying its signature.
///
/// Performs one pass over the token: size check, segment check, then
/// base64url + JSON decoding of header and payload. The signature segment is
/// not decoded here.
///
/// # Errors
///
/// - `Empty` - the token string is empty
/// - `TokenTooLarge` - token exceeds [`MAX_JWT_SIZE_BYTES`]
/// - `MalformedToken` - not three segments, empty header/payload, bad
///   base64url, header or payload not a JSON object, or header without a
///   string `alg`
pub fn inspect_token(token: &str) -> Result<UnverifiedToken, JwtInspectionError> {
    if token.is_empty() {
        return Err(JwtInspectionError::Empty);
    }

    // Check token size first (DoS prevention)
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtInspectionError::TokenTooLarge);
    }

    // JWT format: header.payload.signature
    let mut parts = token.split('.');
    let (Some(header_part), Some(payload_part), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        tracing::debug!(
            target: "common.jwt",
            parts = token.split('.').count(),
            "Token rejected: invalid JWT format"
        );
        return Err(JwtInspectionError::MalformedToken);
    };

    if header_part.is_empty() || payload_part.is_empty() {
        tracing::debug!(target: "common.jwt", "Token rejected: empty header or payload segment");
        return Err(JwtInspectionError::MalformedToken);
    }

    let header = decode_json_segment(header_part, "header")?;
    let payload = decode_json_segment(payload_part, "payload")?;

    let alg = header
        .get("alg")
        .and_then(serde_json::Value::as_str)
        .map(ToString::to_string)
        .ok_or_else(|| {
            tracing::debug!(target: "common.jwt", "Token rejected: header has no alg");
            JwtInspectionError::MalformedToken
        })?;

    // Empty kid is treated as absent
    let kid = header
        .get("kid")
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string);

    let issuer = payload
        .get("iss")
        .and_then(serde_json::Value::as_str)
        .map(ToString::to_string);

    Ok(UnverifiedToken { kid, alg, issuer })
}

/// Decode one base64url JWT segment into a JSON object.
fn decode_json_segment(
    segment: &str,
    name: &'static str,
) -> Result<serde_json::Map<String, serde_json::Value>, JwtInspectionError> {
    let bytes = URL_SAFE_NO_PAD.decode(segment).map_err(|e| {
        tracing::debug!(target: "common.jwt", segment = name, error = %e, "Failed to decode JWT segment base64");
        JwtInspectionError::MalformedToken
    })?;

    match serde_json::from_slice::<serde_json::Value>(&bytes) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(_) => {
            tracing::debug!(target: "common.jwt", segment = name, "JWT segment is not a JSON object");
            Err(JwtInspectionError::MalformedToken)
        }
        Err(e) => {
            tracing::debug!(target: "common.jwt", segment = name, error = %e, "Failed to parse JWT segment JSON");
            Err(JwtInspectionError::MalformedToken)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
