//! Stylist Server
//!
//! HTTP API over the recommendation workflow: chat turns, sessions, direct
//! search, browse endpoints and administration.

pub mod http;
pub mod metrics;
pub mod session;
pub mod state;

pub use http::create_router;
pub use metrics::{init_metrics, record_request};
pub use session::{ChatMessage, ChatRole, Session, SessionInfo, SessionManager};
pub use state::AppState;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Capacity exceeded: {0}")]
    Capacity(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Capacity(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Config(_) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        }
    }
}

impl From<ServerError> for StatusCode {
    fn from(err: ServerError) -> Self {
        err.status()
    }
}

impl From<stylist_core::Error> for ServerError {
    fn from(err: stylist_core::Error) -> Self {
        use stylist_core::Error;
        match err {
            Error::Validation(msg) => ServerError::InvalidRequest(msg),
            Error::NotFound(msg) => ServerError::NotFound(msg),
            Error::Config(msg) => ServerError::Config(msg),
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl From<stylist_rag::RagError> for ServerError {
    fn from(err: stylist_rag::RagError) -> Self {
        stylist_core::Error::from(err).into()
    }
}

impl From<stylist_llm::LlmError> for ServerError {
    fn from(err: stylist_llm::LlmError) -> Self {
        stylist_core::Error::from(err).into()
    }
}

impl From<stylist_agent::AgentError> for ServerError {
    fn from(err: stylist_agent::AgentError) -> Self {
        stylist_core::Error::from(err).into()
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %message, "Request failed");
        }
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            StatusCode::from(ServerError::NotFound("s".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            StatusCode::from(ServerError::InvalidRequest("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            StatusCode::from(ServerError::Capacity("full".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            StatusCode::from(ServerError::Internal("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_core_error_conversion() {
        let err: ServerError = stylist_core::Error::Validation("bad".into()).into();
        assert!(matches!(err, ServerError::InvalidRequest(_)));

        let err: ServerError = stylist_core::Error::Provider("down".into()).into();
        assert!(matches!(err, ServerError::Internal(_)));
    }
}
