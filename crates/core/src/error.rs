//! Error taxonomy shared by every layer of the engine.
//!
//! Mirrors the error-kind classification in the design: validation and
//! not-found errors surface to the transport boundary largely unchanged,
//! retryable errors are handled by `relay-resilience`, and per-unit
//! failures (one target language failing translation or synthesis) never
//! reach this type at all — they're absorbed where they occur and simply
//! omitted from a result map.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("transient error (retryable): {0}")]
    RetryableTransient(String),

    #[error("service degraded: {0}")]
    ServiceDegraded(String),

    #[error("session at capacity")]
    SessionFull,

    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether a `relay-resilience` retry loop should retry this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::RetryableTransient(_))
    }

    /// The wire error code used on the client transport boundary.
    pub fn wire_code(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "INVALID_PARAMETERS",
            CoreError::NotFound(_) => "SESSION_NOT_FOUND",
            CoreError::AlreadyExists(_) => "CONDITIONAL_CHECK_FAILED",
            CoreError::RateLimited { .. } => "RATE_LIMIT_EXCEEDED",
            CoreError::Unauthorized(_) => "UNAUTHORIZED",
            CoreError::RetryableTransient(_) => "SERVICE_UNAVAILABLE",
            CoreError::ServiceDegraded(_) => "SERVICE_UNAVAILABLE",
            CoreError::SessionFull => "SESSION_FULL",
            CoreError::UnsupportedLanguage(_) => "UNSUPPORTED_LANGUAGE",
            CoreError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
