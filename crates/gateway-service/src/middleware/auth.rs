//! Authentication gate.
//!
//! [`AuthState::evaluate`] decides the fate of one request and is free of
//! axum types so it can be tested directly. [`require_auth`] adapts it to
//! an axum middleware: it attaches claims to request extensions and
//! forwards, or renders the rejection.
//!
//! Every request reaches exactly one terminal [`GateOutcome`]. The path
//! allow-list is consulted before the Authorization header is read.

use crate::auth::{Claims, JwksClient, JwksError, JwtValidator, ValidationPolicy};
use crate::config::{AuthMode, Config};
use crate::errors::GatewayError;
use crate::models::TokenInstructions;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Required Authorization scheme prefix (case-sensitive).
const BEARER_PREFIX: &str = "Bearer ";

/// How the gate treats requests to non-excluded paths.
pub enum GateMode {
    /// Tokens are validated; missing credentials get remediation instructions.
    Enforced {
        validator: Arc<JwtValidator>,
        instructions: TokenInstructions,
    },

    /// Every request is forwarded with the placeholder identity.
    Disabled,
}

/// Terminal state of the gate for one request.
#[derive(Debug)]
pub enum GateOutcome {
    /// Path is allow-listed; forwarded without claims.
    Excluded,

    /// Auth disabled; forwarded with the placeholder identity.
    Development(Claims),

    /// Request refused.
    Rejected(GatewayError),

    /// Token valid; forwarded with its claims.
    Authenticated(Claims),
}

/// State for the authentication middleware.
pub struct AuthState {
    /// Path prefixes that bypass the gate.
    excluded_paths: Vec<String>,

    mode: GateMode,
}

impl AuthState {
    pub fn new(excluded_paths: Vec<String>, mode: GateMode) -> Self {
        Self {
            excluded_paths,
            mode,
        }
    }

    /// Build the gate, key resolver and validator from configuration.
    pub fn from_config(config: &Config) -> Self {
        let mode = match &config.auth {
            AuthMode::Enforced(settings) => {
                let jwks_client = Arc::new(JwksClient::with_settings(
                    settings.jwks_url.clone(),
                    Duration::from_secs(settings.jwks_cache_ttl_seconds),
                    Duration::from_secs(settings.jwks_min_refresh_seconds),
                ));
                let validator = Arc::new(JwtValidator::new(
                    jwks_client,
                    ValidationPolicy::from(settings),
                ));
                GateMode::Enforced {
                    validator,
                    instructions: TokenInstructions::client_credentials(
                        settings.token_endpoint(),
                        settings.required_scope.clone(),
                    ),
                }
            }
            AuthMode::Disabled => GateMode::Disabled,
        };

        Self::new(config.excluded_paths.clone(), mode)
    }

    /// Whether tokens are validated.
    pub fn enforced(&self) -> bool {
        matches!(self.mode, GateMode::Enforced { .. })
    }

    /// Whether `path` falls under an allow-listed prefix.
    ///
    /// Prefixes match whole path segments: `/health` covers `/health` and
    /// `/health/live` but not `/healthz-private`. A prefix ending in `/`
    /// covers everything beneath it.
    pub fn is_excluded(&self, path: &str) -> bool {
        self.excluded_paths.iter().any(|prefix| {
            path.strip_prefix(prefix.as_str()).is_some_and(|rest| {
                rest.is_empty() || rest.starts_with('/') || prefix.ends_with('/')
            })
        })
    }

    /// Refetch signing keys. `Ok(false)` when auth is disabled.
    pub async fn refresh_keys(&self) -> Result<bool, JwksError> {
        match &self.mode {
            GateMode::Enforced { validator, .. } => {
                validator.jwks_client().force_refresh().await?;
                Ok(true)
            }
            GateMode::Disabled => Ok(false),
        }
    }

    /// Run the gate for one request.
    ///
    /// `authorization` is the Authorization header value, `None` when the
    /// header is absent or not valid UTF-8.
    pub async fn evaluate(&self, path: &str, authorization: Option<&str>) -> GateOutcome {
        if self.is_excluded(path) {
            tracing::trace!(target: "gateway.middleware.auth", path = %path, "Path excluded from auth");
            return GateOutcome::Excluded;
        }

        let (validator, instructions) = match &self.mode {
            GateMode::Enforced {
                validator,
                instructions,
            } => (validator, instructions),
            GateMode::Disabled => return GateOutcome::Development(Claims::development()),
        };

        let Some(token) = authorization.and_then(|h| h.strip_prefix(BEARER_PREFIX)) else {
            tracing::debug!(target: "gateway.middleware.auth", "Missing or non-bearer Authorization header");
            return GateOutcome::Rejected(GatewayError::missing_credential(instructions.clone()));
        };

        match validator.validate(token).await {
            Ok(claims) => GateOutcome::Authenticated(claims),
            Err(reason) => {
                tracing::info!(
                    target: "gateway.middleware.auth",
                    reason = reason.as_str(),
                    "Request rejected"
                );
                GateOutcome::Rejected(reason.into())
            }
        }
    }
}

/// Authentication middleware applied to the whole router.
///
/// # Response
///
/// - Returns 401 Unauthorized if the token is missing or invalid
/// - Continues to the next handler with `Claims` in extensions if the token is
///   valid, or with the placeholder identity if auth is disabled
/// - Continues without claims for allow-listed paths
#[instrument(skip_all, name = "gateway.middleware.auth")]
pub async fn require_auth(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let authorization = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    match state.evaluate(req.uri().path(), authorization).await {
        GateOutcome::Excluded => next.run(req).await,
        GateOutcome::Development(claims) | GateOutcome::Authenticated(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        GateOutcome::Rejected(err) => err.into_response(),
    }
}
