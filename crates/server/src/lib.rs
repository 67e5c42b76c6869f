//! Diagnostic Assistant Server
//!
//! Provides the HTTP API and Server-Sent Events stream for guided
//! diagnostic sessions.

pub mod http;
pub mod metrics;
pub mod session;
pub mod state;

pub use http::create_router;
pub use metrics::{
    init_metrics, metrics_handler, record_action, record_rejection, record_session_created,
    record_session_outcome,
};
pub use session::{Session, SessionManager};
pub use state::AppState;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use diag_assist_agent::FlowError;
use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Max sessions reached ({0})")]
    Capacity(usize),

    #[error(transparent)]
    Flow(#[from] FlowError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Capacity(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Flow(FlowError::EmptyInput) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::Flow(FlowError::Core(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Flow(_) => StatusCode::CONFLICT,
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServerError> for StatusCode {
    fn from(err: ServerError) -> Self {
        err.status_code()
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let reason = match &self {
            ServerError::Flow(flow) => flow.reason(),
            ServerError::SessionNotFound(_) => "session_not_found",
            ServerError::Capacity(_) => "capacity",
            ServerError::InvalidRequest(_) => "invalid_request",
            ServerError::Internal(_) => "internal",
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (
            status,
            Json(serde_json::json!({
                "error": self.to_string(),
                "reason": reason,
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diag_assist_core::{OperatorAction, Phase};

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ServerError::SessionNotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServerError::from(FlowError::Composing).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServerError::from(FlowError::InvalidAction {
                action: OperatorAction::SubmitTriage,
                phase: Phase::Start,
            })
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServerError::from(FlowError::EmptyInput).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
