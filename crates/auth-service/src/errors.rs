//! Auth service error types.
//!
//! Every error maps onto a gRPC status via `From<AuthError> for Status`.
//! Store, database, signing and timeout failures collapse into an opaque
//! `Internal` status; their detail is logged server-side only.

use thiserror::Error;
use tonic::{Code, Status};

/// Message returned to callers for every internal failure.
pub const INTERNAL_ERROR_MESSAGE: &str = "an internal error occurred";

/// Auth service error type.
///
/// Maps to gRPC codes:
/// - Unauthenticated: Unauthenticated
/// - InvalidArgument: InvalidArgument
/// - NotFound: NotFound
/// - Store, Database, Crypto, Timeout, Internal: Internal
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Session store error: {0}")]
    Store(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptographic error: {0}")]
    Crypto(String),

    #[error("Operation timed out: {0}")]
    Timeout(&'static str),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        AuthError::Unauthenticated(message.into())
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        AuthError::InvalidArgument(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AuthError::NotFound(message.into())
    }

    /// gRPC code this error is reported with.
    pub fn code(&self) -> Code {
        match self {
            AuthError::Unauthenticated(_) => Code::Unauthenticated,
            AuthError::InvalidArgument(_) => Code::InvalidArgument,
            AuthError::NotFound(_) => Code::NotFound,
            AuthError::Store(_)
            | AuthError::Database(_)
            | AuthError::Crypto(_)
            | AuthError::Timeout(_)
            | AuthError::Internal(_) => Code::Internal,
        }
    }
}

impl From<AuthError> for Status {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthenticated(message) => Status::unauthenticated(message),
            AuthError::InvalidArgument(message) => Status::invalid_argument(message),
            AuthError::NotFound(message) => Status::not_found(message),
            AuthError::Store(detail) => {
                tracing::error!(target: "auth.store", error = %detail, "Session store operation failed");
                Status::internal(INTERNAL_ERROR_MESSAGE)
            }
            AuthError::Database(detail) => {
                tracing::error!(target: "auth.database", error = %detail, "Database operation failed");
                Status::internal(INTERNAL_ERROR_MESSAGE)
            }
            AuthError::Crypto(detail) => {
                tracing::error!(target: "auth.crypto", error = %detail, "Cryptographic operation failed");
                Status::internal(INTERNAL_ERROR_MESSAGE)
            }
            AuthError::Timeout(operation) => {
                tracing::error!(target: "auth.timeout", operation, "Operation exceeded context timeout");
                Status::internal(INTERNAL_ERROR_MESSAGE)
            }
            AuthError::Internal(detail) => {
                tracing::error!(target: "auth.internal", error = %detail, "Internal error");
                Status::internal(INTERNAL_ERROR_MESSAGE)
            }
        }
    }
}

impl From<redis::RedisError> for AuthError {
    fn from(err: redis::RedisError) -> Self {
        AuthError::Store(err.to_string())
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        AuthError::Database(err.to_string())
    }
}
