//! Error handling for the berth server.
//!
//! Orchestrator errors are mapped onto HTTP status codes here. Dependency failures are logged in
//! full and reported to the client only as an internal error.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use berth_core::BerthError;
use serde::Serialize;
use thiserror::Error;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The result of a server operation.
pub type ServerResult<T> = Result<T, ServerError>;

/// An error returned by the berth server.
#[derive(pretty_error_debug::Debug, Error)]
pub enum ServerError {
    /// The server was configured incorrectly.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// The request carried no valid credentials.
    #[error("authentication failed: {0}")]
    AuthenticationError(String),

    /// The request body could not be understood.
    #[error("invalid request: {0}")]
    ValidationError(String),

    /// An error raised by the orchestrator.
    #[error(transparent)]
    Berth(#[from] BerthError),

    /// An unexpected internal failure.
    #[error("internal server error: {0}")]
    InternalError(String),
}

/// Error body returned to clients.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Short machine-readable category
    pub kind: String,

    /// Human readable message
    pub error: String,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ServerError {
    /// The HTTP status code this error is reported with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::AuthenticationError(_) => StatusCode::UNAUTHORIZED,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::Berth(e) => match e {
                BerthError::Validation(_) => StatusCode::BAD_REQUEST,
                BerthError::NotFound { .. } => StatusCode::NOT_FOUND,
                BerthError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
                BerthError::Conflict(_) => StatusCode::CONFLICT,
                BerthError::InvalidJobTransition { .. } | BerthError::Dependency(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::ConfigError(_) | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::AuthenticationError(_) => "unauthenticated",
            Self::ValidationError(_) => "validation",
            Self::Berth(e) => e.category(),
            Self::ConfigError(_) | Self::InternalError(_) => "internal",
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        Self::ValidationError(rejection.body_text())
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = if status.is_server_error() {
            tracing::error!("request failed: {}", self);
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            kind: self.kind().to_string(),
            error: message,
        };

        (status, Json(body)).into_response()
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (BerthError::Validation("image".into()), StatusCode::BAD_REQUEST),
            (BerthError::container_not_found("c"), StatusCode::NOT_FOUND),
            (
                BerthError::PermissionDenied {
                    kind: berth_core::ResourceKind::Container,
                    id: "c".into(),
                },
                StatusCode::FORBIDDEN,
            ),
            (BerthError::Conflict("c".into()), StatusCode::CONFLICT),
            (
                BerthError::dependency("socket closed"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(ServerError::from(error).status_code(), status);
        }

        assert_eq!(
            ServerError::AuthenticationError("missing".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_dependency_details_are_not_leaked() {
        let response = ServerError::from(BerthError::dependency("secret socket path")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
