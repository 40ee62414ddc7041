//! JWT validation for the token gateway.
//!
//! Validates bearer tokens issued by Microsoft Entra ID using public keys
//! fetched from the tenant's JWKS endpoint.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Only RS256 is accepted, both in the token header and on the JWK
//! - `exp` is required; `exp` and `nbf` use only the configured leeway
//! - Audience and issuer are compared exactly, after the signature is verified
//! - Every failure maps to exactly one [`AuthError`] kind; none are downgraded

use crate::auth::claims::Claims;
use crate::auth::jwks::{Jwk, JwksClient};
use crate::config::TenantSettings;
use crate::errors::AuthError;
use crate::observability::metrics::record_token_validation;
use common::jwt::{inspect_token, JwtInspectionError};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// The only accepted signing algorithm, as it appears in headers and JWKs.
const EXPECTED_ALG: &str = "RS256";

/// Result of validating one token.
pub type ValidationOutcome = Result<Claims, AuthError>;

/// What a token must satisfy beyond a valid signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationPolicy {
    /// Required `aud` value.
    pub audience: String,

    /// Accepted `iss` values.
    pub accepted_issuers: Vec<String>,

    /// Leeway in seconds for `exp` and `nbf`.
    pub leeway_seconds: u64,
}

impl From<&TenantSettings> for ValidationPolicy {
    fn from(settings: &TenantSettings) -> Self {
        Self {
            audience: settings.audience.clone(),
            accepted_issuers: settings.accepted_issuers.clone(),
            leeway_seconds: settings.jwt_clock_skew_seconds,
        }
    }
}

/// JWT validator using the identity provider's JWKS.
pub struct JwtValidator {
    /// JWKS client for fetching public keys.
    jwks_client: Arc<JwksClient>,

    policy: ValidationPolicy,
}

impl JwtValidator {
    /// Create a new JWT validator.
    pub fn new(jwks_client: Arc<JwksClient>, policy: ValidationPolicy) -> Self {
        Self {
            jwks_client,
            policy,
        }
    }

    /// The key resolver this validator uses.
    pub fn jwks_client(&self) -> &Arc<JwksClient> {
        &self.jwks_client
    }

    /// Validate a JWT and return the claims.
    ///
    /// # Security Checks
    ///
    /// Short-circuits on the first failure:
    ///
    /// 1. Empty, oversized or non-three-segment token → `MalformedToken`
    /// 2. Unverified header/payload inspection → `MalformedToken`
    /// 3. Key lookup by `kid` → `KeyLookupFailure`
    /// 4. RS256 signature verification → `SignatureInvalid`
    /// 5. `exp` → `Expired`, `nbf` → `NotYetValid`
    /// 6. `aud` → `AudienceMismatch`
    /// 7. `iss` → `IssuerMismatch`
    #[instrument(skip_all)]
    pub async fn validate(&self, token: &str) -> ValidationOutcome {
        let start = Instant::now();
        let outcome = self.run_checks(token).await;

        match &outcome {
            Ok(_) => {
                tracing::debug!(target: "gateway.auth.jwt", "Token validated successfully");
                record_token_validation("valid", start.elapsed());
            }
            Err(reason) => {
                tracing::debug!(
                    target: "gateway.auth.jwt",
                    reason = reason.as_str(),
                    "Token validation failed"
                );
                record_token_validation(reason.as_str(), start.elapsed());
            }
        }

        outcome
    }

    async fn run_checks(&self, token: &str) -> ValidationOutcome {
        // 1-2. Single unverified pass over header and payload
        let unverified = inspect_token(token).map_err(|e| {
            if e == JwtInspectionError::TokenTooLarge {
                tracing::warn!(target: "gateway.auth.jwt", "Oversized token rejected");
            }
            AuthError::MalformedToken
        })?;

        tracing::debug!(
            target: "gateway.auth.jwt",
            issuer = unverified.issuer.as_deref().unwrap_or("<none>"),
            "Inspecting token"
        );

        // 3. Resolve signing key
        let kid = unverified.kid.as_deref().ok_or_else(|| {
            tracing::debug!(target: "gateway.auth.jwt", "Token header has no kid");
            AuthError::KeyLookupFailure
        })?;
        let jwk = self.jwks_client.get_key(kid).await?;

        // 4-5. Signature, then exp/nbf
        let claims = verify_token(token, &unverified.alg, &jwk, self.policy.leeway_seconds)?;

        // 6. Audience
        if !claims.aud.contains(&self.policy.audience) {
            return Err(AuthError::AudienceMismatch);
        }

        // 7. Issuer (v1.0 and v2.0 forms are both in the accepted set)
        if !self.policy.accepted_issuers.contains(&claims.iss) {
            return Err(AuthError::IssuerMismatch);
        }

        Ok(claims)
    }
}

/// Verify the RS256 signature and time-based claims, returning typed claims.
fn verify_token(
    token: &str,
    header_alg: &str,
    jwk: &Jwk,
    leeway_seconds: u64,
) -> Result<Claims, AuthError> {
    if jwk.kty != "RSA" {
        tracing::warn!(target: "gateway.auth.jwt", kty = %jwk.kty, "Unexpected JWK key type");
        return Err(AuthError::SignatureInvalid);
    }
    if let Some(key_use) = &jwk.key_use {
        if key_use != "sig" {
            tracing::warn!(target: "gateway.auth.jwt", key_use = %key_use, "JWK is not a signing key");
            return Err(AuthError::SignatureInvalid);
        }
    }
    if let Some(alg) = &jwk.alg {
        if alg != EXPECTED_ALG {
            tracing::warn!(target: "gateway.auth.jwt", alg = %alg, "Unexpected JWK algorithm");
            return Err(AuthError::SignatureInvalid);
        }
    }

    // Checked before decoding: `none` is not representable in the library's header type
    if header_alg != EXPECTED_ALG {
        tracing::warn!(target: "gateway.auth.jwt", alg = %header_alg, "Token asserts unexpected algorithm");
        return Err(AuthError::SignatureInvalid);
    }

    let (Some(n), Some(e)) = (jwk.n.as_deref(), jwk.e.as_deref()) else {
        tracing::error!(target: "gateway.auth.jwt", kid = %jwk.kid, "JWK missing n or e");
        return Err(AuthError::SignatureInvalid);
    };

    let decoding_key = DecodingKey::from_rsa_components(n, e).map_err(|e| {
        tracing::error!(target: "gateway.auth.jwt", error = %e, "Invalid RSA key components");
        AuthError::SignatureInvalid
    })?;

    let mut validation = Validation::new(Algorithm::RS256);
    validation.leeway = leeway_seconds;
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.set_required_spec_claims(&["exp"]);
    // Audience and issuer are compared by the caller
    validation.validate_aud = false;

    let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
        tracing::debug!(target: "gateway.auth.jwt", error = %e, "Token verification failed");
        map_decode_error(e.kind())
    })?;

    Ok(token_data.claims)
}

/// Map a library error onto the failure taxonomy. Unknown kinds fail closed.
fn map_decode_error(kind: &ErrorKind) -> AuthError {
    match kind {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::ImmatureSignature => AuthError::NotYetValid,
        ErrorKind::InvalidToken
        | ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_)
        | ErrorKind::MissingRequiredClaim(_) => AuthError::MalformedToken,
        _ => AuthError::SignatureInvalid,
    }
}
