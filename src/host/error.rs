//! Error types for the hosting harness.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::agent::AgentError;
use crate::fetch::FetchError;

/// Error type for request handling in the host.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// Upstream fetch failed while answering an intercepted request.
    #[error("Upstream fetch failed: {0}")]
    Upstream(#[from] FetchError),

    /// Internal failure (cache substrate, malformed stored data).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AgentError> for HostError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::Fetch(e) => HostError::Upstream(e),
            other => HostError::Internal(other.to_string()),
        }
    }
}

/// Error response body.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for HostError {
    fn into_response(self) -> Response {
        let (status, error_message, details) = match &self {
            // The request died between us and the origin, not at the origin
            HostError::Upstream(e) => (StatusCode::BAD_GATEWAY, "Bad Gateway", Some(e.to_string())),
            HostError::Internal(msg) => {
                tracing::error!("Internal host error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error",
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_message.to_string(),
            details,
        });

        (status, body).into_response()
    }
}
