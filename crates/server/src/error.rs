//! Server-level error taxonomy: wraps `relay_core::CoreError` plus the
//! transport-boundary failures that never originate in the engine layer.

use axum::http::StatusCode;
use relay_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid action: {0}")]
    InvalidAction(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("connection not found: {0}")]
    ConnectionNotFound(String),

    #[error("unauthorized action: {0}")]
    UnauthorizedAction(String),
}

impl ServerError {
    /// The wire error code reported on the client transport boundary (§6).
    pub fn wire_code(&self) -> &'static str {
        match self {
            ServerError::InvalidAction(_) => "INVALID_ACTION",
            ServerError::Core(err) => err.wire_code(),
            ServerError::ConnectionNotFound(_) => "CONNECTION_NOT_FOUND",
            ServerError::UnauthorizedAction(_) => "UNAUTHORIZED_ACTION",
        }
    }
}

impl From<ServerError> for StatusCode {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::InvalidAction(_) => StatusCode::BAD_REQUEST,
            ServerError::Core(CoreError::Validation(_)) => StatusCode::BAD_REQUEST,
            ServerError::Core(CoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            ServerError::Core(CoreError::AlreadyExists(_)) => StatusCode::CONFLICT,
            ServerError::Core(CoreError::RateLimited { .. }) => StatusCode::TOO_MANY_REQUESTS,
            ServerError::Core(CoreError::Unauthorized(_)) => StatusCode::UNAUTHORIZED,
            ServerError::Core(CoreError::SessionFull) => StatusCode::CONFLICT,
            ServerError::Core(CoreError::UnsupportedLanguage(_)) => StatusCode::BAD_REQUEST,
            ServerError::Core(CoreError::RetryableTransient(_))
            | ServerError::Core(CoreError::ServiceDegraded(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Core(CoreError::Internal(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::ConnectionNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::UnauthorizedAction(_) => StatusCode::FORBIDDEN,
        }
    }
}
