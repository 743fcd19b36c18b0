//! Auth Error Types
//!
//! Service-boundary errors. Every variant maps onto the unified
//! `kernel::error::AppError` vocabulary; nothing store-specific escapes.

use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

/// Auth-specific result type alias
pub type AuthResult<T> = Result<T, AuthError>;

/// Auth-specific error variants
#[derive(Debug, Error)]
pub enum AuthError {
    /// Malformed input (short password, bad email shape, bad JSON)
    #[error("{0}")]
    Validation(String),

    /// Unknown email, wrong password or inactive account.
    /// One message for all causes so accounts cannot be enumerated.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Bad signature, expired, wrong kind, revoked or stale token
    #[error("Invalid or expired token")]
    InvalidToken,

    /// No bearer token on a protected route
    #[error("Missing access token")]
    MissingToken,

    /// Authenticated but not allowed
    #[error("{0}")]
    Forbidden(String),

    /// Duplicate email on create
    #[error("Email already registered")]
    EmailTaken,

    /// Admin lookup of an unknown user
    #[error("User not found")]
    UserNotFound,

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn validation(message: impl Into<String>) -> Self {
        AuthError::Validation(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        AuthError::Forbidden(message.into())
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::Validation(_) => ErrorKind::BadRequest,
            AuthError::InvalidCredentials | AuthError::InvalidToken | AuthError::MissingToken => {
                ErrorKind::Unauthorized
            }
            AuthError::Forbidden(_) => ErrorKind::Forbidden,
            AuthError::EmailTaken => ErrorKind::Conflict,
            AuthError::UserNotFound => ErrorKind::NotFound,
            AuthError::Database(
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_),
            ) => ErrorKind::ServiceUnavailable,
            AuthError::Database(_) => ErrorKind::InternalServerError,
            AuthError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    /// HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    /// Convert to AppError. Server-side details never reach the client.
    pub fn to_app_error(&self) -> AppError {
        match self {
            AuthError::Database(_) | AuthError::Internal(_) => match self.kind() {
                ErrorKind::ServiceUnavailable => AppError::service_unavailable("Service unavailable")
                    .with_action("Please try again later"),
                kind => AppError::new(kind, "Internal server error"),
            },
            other => AppError::new(other.kind(), other.to_string()),
        }
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            AuthError::Database(e) => {
                tracing::error!(error = %e, "Auth database error");
            }
            AuthError::Internal(msg) => {
                tracing::error!(message = %msg, "Auth internal error");
            }
            AuthError::InvalidCredentials => {
                tracing::warn!("Invalid login attempt");
            }
            AuthError::Forbidden(reason) => {
                tracing::warn!(reason = %reason, "Forbidden request");
            }
            _ => {
                tracing::debug!(error = %self, "Auth error");
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

impl From<AppError> for AuthError {
    fn from(err: AppError) -> Self {
        match err.kind() {
            ErrorKind::BadRequest => AuthError::Validation(err.message().to_string()),
            ErrorKind::Conflict => AuthError::EmailTaken,
            _ => AuthError::Internal(err.to_string()),
        }
    }
}

impl From<platform::password::PasswordPolicyError> for AuthError {
    fn from(err: platform::password::PasswordPolicyError) -> Self {
        AuthError::Validation(err.to_string())
    }
}

impl From<platform::password::PasswordHashError> for AuthError {
    fn from(err: platform::password::PasswordHashError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AuthError::validation("bad").status_code(), 400);
        assert_eq!(AuthError::InvalidCredentials.status_code(), 401);
        assert_eq!(AuthError::InvalidToken.status_code(), 401);
        assert_eq!(AuthError::MissingToken.status_code(), 401);
        assert_eq!(AuthError::forbidden("no").status_code(), 403);
        assert_eq!(AuthError::UserNotFound.status_code(), 404);
        assert_eq!(AuthError::EmailTaken.status_code(), 409);
        assert_eq!(AuthError::Internal("x".into()).status_code(), 500);
        assert_eq!(AuthError::Database(sqlx::Error::PoolTimedOut).status_code(), 503);
        assert_eq!(AuthError::Database(sqlx::Error::RowNotFound).status_code(), 500);
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let app = AuthError::Internal("connection string leaked".into()).to_app_error();
        assert_eq!(app.message(), "Internal server error");
    }

    #[test]
    fn test_credential_message_is_generic() {
        let app = AuthError::InvalidCredentials.to_app_error();
        assert_eq!(app.message(), "Invalid credentials");
    }
}
