//! JWT claims structure.
//!
//! Known claims are typed fields; everything else the identity provider
//! adds is kept in `extra`. Identifying fields (`sub`, e-mail-like claims)
//! are redacted in Debug output to prevent exposure in logs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Subject of the placeholder identity used when auth is disabled.
pub const DEVELOPMENT_SUBJECT: &str = "development-user";

/// Display name of the placeholder identity used when auth is disabled.
pub const DEVELOPMENT_NAME: &str = "Development User";

/// The `aud` claim: a single string or an array of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Multiple(Vec<String>),
}

impl Audience {
    /// Whether `expected` is one of the token's audiences.
    pub fn contains(&self, expected: &str) -> bool {
        match self {
            Audience::Single(aud) => aud == expected,
            Audience::Multiple(auds) => auds.iter().any(|aud| aud == expected),
        }
    }
}

impl Default for Audience {
    fn default() -> Self {
        Audience::Multiple(Vec::new())
    }
}

/// Claims of a validated access token.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - redacted in Debug output.
    pub sub: String,

    /// Issuer. Empty when the token carries none.
    #[serde(default)]
    pub iss: String,

    /// Audience(s). Empty when the token carries none.
    #[serde(default)]
    pub aud: Audience,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Issued-at timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Not-before timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// User principal name (v1.0 tokens).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upn: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,

    /// App roles assigned to the caller.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,

    /// Space-separated delegated scopes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scp: Option<String>,

    /// Tenant ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tid: Option<String>,

    /// Object ID of the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oid: Option<String>,

    /// Client ID of the calling application.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azp: Option<String>,

    /// Any other claims carried by the token.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Custom Debug implementation that redacts identifying fields.
impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |value: &Option<String>| value.as_ref().map(|_| "[REDACTED]");

        f.debug_struct("Claims")
            .field("sub", &"[REDACTED]")
            .field("iss", &self.iss)
            .field("aud", &self.aud)
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .field("nbf", &self.nbf)
            .field("name", &redact(&self.name))
            .field("email", &redact(&self.email))
            .field("upn", &redact(&self.upn))
            .field("preferred_username", &redact(&self.preferred_username))
            .field("roles", &self.roles)
            .field("scp", &self.scp)
            .field("tid", &self.tid)
            .field("extra_claims", &self.extra.len())
            .finish_non_exhaustive()
    }
}

impl Claims {
    /// Placeholder identity attached to every request when auth is disabled.
    pub fn development() -> Self {
        Self {
            sub: DEVELOPMENT_SUBJECT.to_string(),
            iss: String::new(),
            aud: Audience::default(),
            exp: 0,
            iat: None,
            nbf: None,
            name: Some(DEVELOPMENT_NAME.to_string()),
            email: None,
            upn: None,
            preferred_username: None,
            roles: Vec::new(),
            scp: None,
            tid: None,
            oid: None,
            azp: None,
            extra: serde_json::Map::new(),
        }
    }

    /// First present of `email`, `upn`, `preferred_username`.
    pub fn email(&self) -> Option<&str> {
        self.email
            .as_deref()
            .or(self.upn.as_deref())
            .or(self.preferred_username.as_deref())
    }

    /// Delegated scopes, split on whitespace.
    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.scp.as_deref().unwrap_or_default().split_whitespace()
    }
}
