//! Gateway models.
//!
//! Response and request bodies shared across handlers and error rendering.

use serde::{Deserialize, Serialize};

/// Service name reported by the health endpoint.
pub const SERVICE_NAME: &str = "MCP Server";

/// Remediation returned to clients that sent no usable bearer credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInstructions {
    pub how_to_get_token: String,
    pub token_endpoint: String,
    pub required_scopes: String,
    pub usage: String,
}

impl TokenInstructions {
    /// Instructions for acquiring a token via the client credentials flow.
    pub fn client_credentials(token_endpoint: String, required_scope: String) -> Self {
        Self {
            how_to_get_token: "Use client credentials flow to acquire a token from Microsoft Entra ID"
                .to_string(),
            token_endpoint,
            required_scopes: required_scope,
            usage: "Include the token in the Authorization header as: Bearer <your_access_token>"
                .to_string(),
        }
    }
}

/// Health check response.
///
/// Returned by the `/health` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always "healthy" while the process serves requests.
    pub status: String,

    pub service: String,

    /// "enabled" or "disabled".
    pub authentication: String,
}

/// Readiness check response.
///
/// Returned by the `/ready` endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    /// "ready" or "not_ready".
    pub status: &'static str,

    /// "available", "unavailable" or "disabled".
    pub jwks: &'static str,

    /// Generic error message, never infrastructure details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_client_credentials_instructions() {
        let instructions = TokenInstructions::client_credentials(
            "https://login.microsoftonline.com/tenant/oauth2/v2.0/token".to_string(),
            "api://client/user_read".to_string(),
        );

        let json = serde_json::to_value(&instructions).unwrap();
        assert_eq!(
            json["token_endpoint"],
            "https://login.microsoftonline.com/tenant/oauth2/v2.0/token"
        );
        assert_eq!(json["required_scopes"], "api://client/user_read");
        assert!(json["how_to_get_token"]
            .as_str()
            .unwrap()
            .contains("client credentials"));
        assert!(json["usage"].as_str().unwrap().contains("Bearer <your_access_token>"));
    }

    #[test]
    fn test_readiness_response_serialization() {
        let ready = ReadinessResponse {
            status: "ready",
            jwks: "available",
            error: None,
        };

        let json = serde_json::to_string(&ready).unwrap();
        assert!(json.contains("\"status\":\"ready\""));
        assert!(json.contains("\"jwks\":\"available\""));
        // Error field should be omitted (skip_serializing_if)
        assert!(!json.contains("\"error\""));
    }
}
