//! Handler for the echo MCP endpoint.

use crate::mcp;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::instrument;

/// Handler for POST /echo/mcp
///
/// One JSON-RPC message per request. Notifications are acknowledged with
/// 202 and no body; everything else gets a JSON-RPC response with 200,
/// including protocol errors.
#[instrument(skip_all, name = "gateway.handlers.mcp")]
pub async fn mcp_endpoint(body: String) -> Response {
    match mcp::handle_message(&body) {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}
