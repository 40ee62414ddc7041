//! Gateway error types.
//!
//! [`AuthError`] is the per-request authentication taxonomy. Every variant
//! is recovered at the auth gate and rendered as a 401. [`GatewayError`]
//! maps to HTTP responses via the `IntoResponse` impl. Messages returned to
//! clients name the check that failed but never include key material or
//! token contents.

use crate::models::TokenInstructions;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Why a request was not authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No Authorization header, or not a Bearer credential.
    #[error("Missing or invalid authorization header")]
    MissingCredential,

    /// Token is not a well-formed JWT.
    #[error("Invalid token: malformed")]
    MalformedToken,

    /// Signing key could not be resolved.
    #[error("Token validation failed: signing key not found")]
    KeyLookupFailure,

    /// Signature verification failed or algorithm mismatch.
    #[error("Invalid token: signature verification failed")]
    SignatureInvalid,

    /// `exp` is in the past.
    #[error("Token has expired")]
    Expired,

    /// `nbf` is in the future.
    #[error("Token is not yet valid")]
    NotYetValid,

    /// `aud` does not name this API.
    #[error("Invalid token audience")]
    AudienceMismatch,

    /// `iss` is not an accepted issuer.
    #[error("Invalid token issuer")]
    IssuerMismatch,
}

impl AuthError {
    /// Stable label for metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthError::MissingCredential => "missing_credential",
            AuthError::MalformedToken => "malformed_token",
            AuthError::KeyLookupFailure => "key_lookup_failure",
            AuthError::SignatureInvalid => "signature_invalid",
            AuthError::Expired => "expired",
            AuthError::NotYetValid => "not_yet_valid",
            AuthError::AudienceMismatch => "audience_mismatch",
            AuthError::IssuerMismatch => "issuer_mismatch",
        }
    }
}

/// Gateway error type.
///
/// Maps to appropriate HTTP status codes:
/// - Unauthorized: 401 Unauthorized
/// - ServiceUnavailable: 503 Service Unavailable
/// - Internal: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Unauthorized: {reason}")]
    Unauthorized {
        reason: AuthError,
        /// Remediation for clients that sent no usable credential.
        instructions: Option<Box<TokenInstructions>>,
    },

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error")]
    Internal,
}

impl GatewayError {
    /// 401 for a request without a usable bearer credential.
    pub fn missing_credential(instructions: TokenInstructions) -> Self {
        GatewayError::Unauthorized {
            reason: AuthError::MissingCredential,
            instructions: Some(Box::new(instructions)),
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::Unauthorized { .. } => 401,
            GatewayError::ServiceUnavailable(_) => 503,
            GatewayError::Internal => 500,
        }
    }
}

impl From<AuthError> for GatewayError {
    fn from(reason: AuthError) -> Self {
        GatewayError::Unauthorized {
            reason,
            instructions: None,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse<'a> {
    error: &'static str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<&'a TokenInstructions>,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            GatewayError::Unauthorized {
                reason: _,
                instructions: Some(instructions),
            } => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse {
                    error: "unauthorized",
                    message: "Missing or invalid authorization header",
                    details: None,
                    instructions: Some(instructions.as_ref()),
                },
            ),
            GatewayError::Unauthorized {
                reason,
                instructions: None,
            } => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse {
                    error: "unauthorized",
                    message: "Valid authentication required. Please provide a valid bearer token.",
                    details: Some(reason.to_string()),
                    instructions: None,
                },
            ),
            GatewayError::ServiceUnavailable(reason) => {
                // Log actual reason server-side
                tracing::warn!(target: "gateway.availability", reason = %reason, "Service unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorResponse {
                        error: "service_unavailable",
                        message: "Service temporarily unavailable",
                        details: None,
                        instructions: None,
                    },
                )
            }
            GatewayError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: "internal_error",
                    message: "An internal error occurred",
                    details: None,
                    instructions: None,
                },
            ),
        };

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }

        response
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;

    // Helper function to read the response body as JSON
    async fn read_body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn instructions() -> TokenInstructions {
        TokenInstructions {
            how_to_get_token: "Use client credentials flow".to_string(),
            token_endpoint: "https://login.example.com/tenant/oauth2/v2.0/token".to_string(),
            required_scopes: "api://client/user_read".to_string(),
            usage: "Bearer <your_access_token>".to_string(),
        }
    }

    #[test]
    fn test_auth_error_messages_name_the_check() {
        assert_eq!(AuthError::Expired.to_string(), "Token has expired");
        assert_eq!(AuthError::AudienceMismatch.to_string(), "Invalid token audience");
        assert_eq!(AuthError::IssuerMismatch.to_string(), "Invalid token issuer");
        assert!(AuthError::SignatureInvalid.to_string().contains("signature"));
        assert!(AuthError::KeyLookupFailure.to_string().contains("signing key"));
        assert!(AuthError::MalformedToken.to_string().contains("malformed"));
    }

    #[test]
    fn test_auth_error_labels_are_distinct() {
        let all = [
            AuthError::MissingCredential,
            AuthError::MalformedToken,
            AuthError::KeyLookupFailure,
            AuthError::SignatureInvalid,
            AuthError::Expired,
            AuthError::NotYetValid,
            AuthError::AudienceMismatch,
            AuthError::IssuerMismatch,
        ];

        let labels: std::collections::HashSet<_> = all.iter().map(AuthError::as_str).collect();
        assert_eq!(labels.len(), all.len());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(GatewayError::from(AuthError::Expired).status_code(), 401);
        assert_eq!(GatewayError::missing_credential(instructions()).status_code(), 401);
        assert_eq!(
            GatewayError::ServiceUnavailable("x".to_string()).status_code(),
            503
        );
        assert_eq!(GatewayError::Internal.status_code(), 500);
    }

    #[tokio::test]
    async fn test_into_response_invalid_token_has_details() {
        let response = GatewayError::from(AuthError::Expired).into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get("WWW-Authenticate").unwrap(),
            "Bearer"
        );

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"], "unauthorized");
        assert_eq!(
            body_json["message"],
            "Valid authentication required. Please provide a valid bearer token."
        );
        assert_eq!(body_json["details"], "Token has expired");
        assert!(body_json.get("instructions").is_none());
    }

    #[tokio::test]
    async fn test_into_response_missing_credential_has_instructions() {
        let response = GatewayError::missing_credential(instructions()).into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get("WWW-Authenticate").unwrap(),
            "Bearer"
        );

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"], "unauthorized");
        assert_eq!(body_json["message"], "Missing or invalid authorization header");
        assert_eq!(
            body_json["instructions"]["token_endpoint"],
            "https://login.example.com/tenant/oauth2/v2.0/token"
        );
        assert_eq!(
            body_json["instructions"]["required_scopes"],
            "api://client/user_read"
        );
        assert!(body_json["instructions"]["usage"].is_string());
        assert!(body_json["instructions"]["how_to_get_token"].is_string());
        assert!(body_json.get("details").is_none());
    }

    #[tokio::test]
    async fn test_into_response_service_unavailable_is_generic() {
        let response =
            GatewayError::ServiceUnavailable("jwks endpoint at 10.0.0.1 down".to_string())
                .into_response();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["message"], "Service temporarily unavailable");
        assert!(!body_json.to_string().contains("10.0.0.1"));
    }

    #[tokio::test]
    async fn test_into_response_internal() {
        let response = GatewayError::Internal.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"], "internal_error");
        assert_eq!(body_json["message"], "An internal error occurred");
    }
}
