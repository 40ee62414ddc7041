//! Builder patterns for test data construction
//!
//! Provides a fluent API for Entra ID shaped access-token claims. Defaults
//! match the harness tenant, so a default-built token validates against a
//! gateway spawned by [`crate::TestGatewayServer`].

use crate::server_harness::{TEST_AUDIENCE, TEST_V2_ISSUER};
use chrono::{Duration, Utc};
use serde_json::{json, Map, Value};

/// Builder for creating test JWT claims
///
/// # Example
/// ```rust,ignore
/// let claims = TestTokenBuilder::new()
///     .for_user("alice")
///     .with_scp("user_read")
///     .expires_in(3600)
///     .build();
/// let token = TestRsaKey::primary("kid-1").sign(&claims)?;
/// ```
pub struct TestTokenBuilder {
    claims: Map<String, Value>,
}

impl TestTokenBuilder {
    /// Create a new token builder with defaults
    pub fn new() -> Self {
        let now = Utc::now();
        let claims = json!({
            "sub": "test-subject",
            "iss": TEST_V2_ISSUER,
            "aud": TEST_AUDIENCE,
            "exp": (now + Duration::seconds(3600)).timestamp(),
            "iat": now.timestamp(),
            "nbf": now.timestamp(),
            "name": "Test User",
            "preferred_username": "test.user@example.com",
            "tid": crate::server_harness::TEST_TENANT_ID,
            "ver": "2.0"
        });

        let claims = match claims {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        Self { claims }
    }

    /// Set the subject
    pub fn for_user(self, subject: &str) -> Self {
        self.with_claim("sub", json!(subject))
    }

    pub fn with_issuer(self, issuer: &str) -> Self {
        self.with_claim("iss", json!(issuer))
    }

    /// Single-string audience
    pub fn with_audience(self, audience: &str) -> Self {
        self.with_claim("aud", json!(audience))
    }

    /// Array audience
    pub fn with_audiences(self, audiences: &[&str]) -> Self {
        self.with_claim("aud", json!(audiences))
    }

    /// Set expiration in seconds from now (negative for already expired)
    pub fn expires_in(self, seconds: i64) -> Self {
        self.with_claim("exp", json!((Utc::now() + Duration::seconds(seconds)).timestamp()))
    }

    /// Set `nbf` in seconds from now
    pub fn not_before_in(self, seconds: i64) -> Self {
        self.with_claim("nbf", json!((Utc::now() + Duration::seconds(seconds)).timestamp()))
    }

    /// Set issued-at timestamp
    pub fn issued_at(self, timestamp: i64) -> Self {
        self.with_claim("iat", json!(timestamp))
    }

    /// Set delegated scopes (space-separated)
    pub fn with_scp(self, scp: &str) -> Self {
        self.with_claim("scp", json!(scp))
    }

    pub fn with_roles(self, roles: &[&str]) -> Self {
        self.with_claim("roles", json!(roles))
    }

    pub fn with_email(self, email: &str) -> Self {
        self.with_claim("email", json!(email))
    }

    /// Set `upn`, as carried by v1.0 tokens
    pub fn with_upn(self, upn: &str) -> Self {
        self.with_claim("upn", json!(upn))
    }

    /// Set or replace an arbitrary claim
    pub fn with_claim(mut self, name: &str, value: Value) -> Self {
        self.claims.insert(name.to_string(), value);
        self
    }

    /// Remove a claim entirely
    pub fn without(mut self, name: &str) -> Self {
        self.claims.remove(name);
        self
    }

    /// Build the claims as a JSON value
    pub fn build(self) -> Value {
        Value::Object(self.claims)
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_claims_target_harness_tenant() {
        let claims = TestTokenBuilder::new().build();

        assert_eq!(claims["sub"], "test-subject");
        assert_eq!(claims["iss"], TEST_V2_ISSUER);
        assert_eq!(claims["aud"], TEST_AUDIENCE);
        assert!(claims["exp"].as_i64().unwrap() > Utc::now().timestamp());
    }

    #[test]
    fn test_builder_pattern() {
        let claims = TestTokenBuilder::new()
            .for_user("alice")
            .with_scp("user_read user_write")
            .with_roles(&["Reader"])
            .build();

        assert_eq!(claims["sub"], "alice");
        assert_eq!(claims["scp"], "user_read user_write");
        assert_eq!(claims["roles"], json!(["Reader"]));
    }

    #[test]
    fn test_expires_in_negative_is_in_the_past() {
        let claims = TestTokenBuilder::new().expires_in(-60).build();
        assert!(claims["exp"].as_i64().unwrap() < Utc::now().timestamp());
    }

    #[test]
    fn test_with_audiences_builds_array() {
        let claims = TestTokenBuilder::new()
            .with_audiences(&["api://other", TEST_AUDIENCE])
            .build();

        assert_eq!(claims["aud"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_without_removes_claim() {
        let claims = TestTokenBuilder::new().without("exp").build();
        assert!(claims.get("exp").is_none());
    }
}
