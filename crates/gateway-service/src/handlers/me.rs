//! Current user handler.
//!
//! Projects the authenticated caller's claims into a stable response shape.

use crate::auth::Claims;
use axum::{Extension, Json};
use serde::Serialize;
use tracing::instrument;

/// Response for `/me` endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct MeResponse {
    /// Subject of the token.
    pub user_id: String,

    pub name: Option<String>,

    /// First present of `email`, `upn`, `preferred_username`.
    pub email: Option<String>,

    pub roles: Vec<String>,

    /// Delegated scopes split from `scp`.
    pub scopes: Vec<String>,
}

impl From<Claims> for MeResponse {
    fn from(claims: Claims) -> Self {
        let email = claims.email().map(ToString::to_string);
        let scopes = claims.scopes().map(ToString::to_string).collect();

        Self {
            user_id: claims.sub,
            name: claims.name,
            email,
            roles: claims.roles,
            scopes,
        }
    }
}

/// Handler for GET /me
///
/// Returns the caller's identity from the request's claims. With auth
/// disabled this is the placeholder development identity.
///
/// ## Response
///
/// ```json
/// {
///   "user_id": "7f1c...",
///   "name": "Ada Lovelace",
///   "email": "ada@example.com",
///   "roles": ["Reader"],
///   "scopes": ["user_read"]
/// }
/// ```
#[instrument(skip_all, name = "gateway.handlers.me")]
pub async fn get_me(Extension(claims): Extension<Claims>) -> Json<MeResponse> {
    tracing::debug!(target: "gateway.handlers.me", "Returning user claims");
    Json(MeResponse::from(claims))
}
