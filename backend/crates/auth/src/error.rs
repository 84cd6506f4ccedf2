//! Auth Error Types
//!
//! This module provides auth-specific error variants that integrate
//! with the unified `kernel::error::AppError` system. Each variant carries a
//! stable machine code the frontend branches on.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::value_object::auth_provider::AuthProvider;

/// Auth-specific result type alias
pub type AuthResult<T> = Result<T, AuthError>;

/// Auth-specific error variants
#[derive(Debug, Error)]
pub enum AuthError {
    /// Required request fields are missing or blank
    #[error("Missing required fields")]
    MissingFields(Vec<&'static str>),

    #[error("Passwords do not match")]
    PasswordMismatch,

    /// Password misses one or more strength rules (one message per rule)
    #[error("Password does not meet the requirements")]
    WeakPassword(Vec<String>),

    #[error("Invalid email format")]
    InvalidEmail,

    /// Generic request validation failure
    #[error("{0}")]
    Validation(String),

    /// An active account already holds this email
    #[error("An account with this email already exists")]
    EmailExists,

    /// Unknown email or wrong password
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// The account belongs to another provider (login, activation)
    #[error("This account uses {0} sign-in")]
    ProviderMismatch(AuthProvider),

    /// The account belongs to another provider (password reset)
    #[error("Password reset is not available for {0} accounts")]
    WrongAuthProvider(AuthProvider),

    /// Too many failed login attempts inside the lockout window
    #[error("Too many failed login attempts. Please try again later")]
    AccountLocked { retry_after_secs: u64 },

    #[error("Account is not activated")]
    AccountNotActive,

    #[error("User not found")]
    UserNotFound,

    #[error("Account is already active")]
    AlreadyActive,

    #[error("Invalid code")]
    InvalidCode,

    #[error("Code has expired")]
    CodeExpired,

    /// New password verifies against the current hash
    #[error("New password must be different from the current password")]
    SamePassword,

    /// An unexpired reset code is still outstanding
    #[error("A reset code was sent recently")]
    ResetCooldown { remaining_secs: u64 },

    /// Refresh token invalid, unknown or already rotated
    #[error("Session expired")]
    SessionExpired,

    #[error("Authentication required")]
    Unauthorized,

    #[error("Too many requests")]
    RateLimited { retry_after_secs: u64 },

    /// Outgoing mail could not be delivered
    #[error("Failed to send email: {0}")]
    EmailDelivery(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::MissingFields(_)
            | AuthError::PasswordMismatch
            | AuthError::WeakPassword(_)
            | AuthError::InvalidEmail
            | AuthError::Validation(_)
            | AuthError::ProviderMismatch(_)
            | AuthError::AlreadyActive
            | AuthError::InvalidCode
            | AuthError::CodeExpired
            | AuthError::SamePassword => ErrorKind::BadRequest,
            AuthError::InvalidCredentials | AuthError::SessionExpired | AuthError::Unauthorized => {
                ErrorKind::Unauthorized
            }
            AuthError::WrongAuthProvider(_) | AuthError::AccountNotActive => ErrorKind::Forbidden,
            AuthError::UserNotFound => ErrorKind::NotFound,
            AuthError::EmailExists => ErrorKind::Conflict,
            AuthError::AccountLocked { .. }
            | AuthError::ResetCooldown { .. }
            | AuthError::RateLimited { .. } => ErrorKind::TooManyRequests,
            AuthError::EmailDelivery(_) | AuthError::Database(_) | AuthError::Internal(_) => {
                ErrorKind::InternalServerError
            }
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Machine-readable code sent as `code` in the error body
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingFields(_) => "MISSING_FIELDS",
            AuthError::PasswordMismatch => "PASSWORD_MISMATCH",
            AuthError::WeakPassword(_) => "WEAK_PASSWORD",
            AuthError::InvalidEmail => "INVALID_EMAIL",
            AuthError::Validation(_) => "VALIDATION_ERROR",
            AuthError::EmailExists => "EMAIL_EXISTS",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::ProviderMismatch(_) => "AUTH_PROVIDER_MISMATCH",
            AuthError::WrongAuthProvider(_) => "WRONG_AUTH_PROVIDER",
            AuthError::AccountLocked { .. } => "ACCOUNT_LOCKED",
            AuthError::AccountNotActive => "ACCOUNT_NOT_ACTIVE",
            AuthError::UserNotFound => "USER_NOT_FOUND",
            AuthError::AlreadyActive => "ALREADY_ACTIVE",
            AuthError::InvalidCode => "INVALID_CODE",
            AuthError::CodeExpired => "CODE_EXPIRED",
            AuthError::SamePassword => "SAME_PASSWORD",
            AuthError::ResetCooldown { .. } => "RESET_COOLDOWN",
            AuthError::SessionExpired => "SESSION_EXPIRED",
            AuthError::Unauthorized => "UNAUTHORIZED",
            AuthError::RateLimited { .. } => "RATE_LIMITED",
            AuthError::EmailDelivery(_) => "EMAIL_FAILED",
            AuthError::Database(_) | AuthError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.kind().is_server_error()
    }

    fn retry_after_secs(&self) -> Option<u64> {
        match self {
            AuthError::AccountLocked { retry_after_secs }
            | AuthError::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            AuthError::ResetCooldown { remaining_secs } => Some(*remaining_secs),
            _ => None,
        }
    }

    /// Convert to AppError, carrying the variant's extra body fields
    pub fn to_app_error(&self) -> AppError {
        let error = AppError::new(self.kind(), self.to_string()).with_code(self.code());

        match self {
            AuthError::MissingFields(fields) => error.with_detail("fields", fields.clone()),
            AuthError::WeakPassword(details) => error.with_detail("details", details.clone()),
            AuthError::ProviderMismatch(provider) | AuthError::WrongAuthProvider(provider) => {
                error.with_detail("provider", provider.as_str())
            }
            AuthError::AccountLocked { retry_after_secs }
            | AuthError::RateLimited { retry_after_secs } => {
                error.with_detail("retryAfterSeconds", *retry_after_secs)
            }
            AuthError::ResetCooldown { remaining_secs } => {
                error.with_detail("remainingSeconds", *remaining_secs)
            }
            AuthError::AccountNotActive => error.with_detail("canResend", true),
            _ => error,
        }
    }

    /// Log the error with appropriate level
    fn log(&self, request_id: Option<Uuid>) {
        match self {
            AuthError::Database(e) => {
                tracing::error!(request_id = ?request_id, error = %e, "Auth database error");
            }
            AuthError::Internal(msg) => {
                tracing::error!(request_id = ?request_id, message = %msg, "Auth internal error");
            }
            AuthError::EmailDelivery(msg) => {
                tracing::error!(request_id = ?request_id, message = %msg, "Auth mail delivery failed");
            }
            AuthError::InvalidCredentials => {
                tracing::warn!("Invalid login attempt");
            }
            AuthError::AccountLocked { .. } => {
                tracing::warn!("Login attempt on locked account");
            }
            AuthError::ProviderMismatch(provider) | AuthError::WrongAuthProvider(provider) => {
                tracing::warn!(provider = %provider, "Cross-provider attempt rejected");
            }
            AuthError::RateLimited { .. } => {
                tracing::warn!("Rate limit exceeded");
            }
            _ => {
                tracing::debug!(code = self.code(), error = %self, "Auth error");
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let request_id = self.is_server_error().then(Uuid::new_v4);
        self.log(request_id);

        let mut app_error = self.to_app_error();
        if let Some(id) = request_id {
            app_error = app_error.with_request_id(id);
        }

        let mut response = app_error.into_response();
        if let Some(secs) = self.retry_after_secs() {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 4096)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AuthError::EmailExists.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AuthError::AccountLocked { retry_after_secs: 60 }.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AuthError::WrongAuthProvider(AuthProvider::Google).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AuthError::ProviderMismatch(AuthProvider::Google).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::Internal("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_provider_field_in_body() {
        let response = AuthError::ProviderMismatch(AuthProvider::Google).into_response();
        let body = body_of(response).await;

        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "AUTH_PROVIDER_MISMATCH");
        assert_eq!(body["provider"], "google");
    }

    #[tokio::test]
    async fn test_locked_carries_retry_after() {
        let response = AuthError::AccountLocked {
            retry_after_secs: 120,
        }
        .into_response();
        assert_eq!(response.headers()[header::RETRY_AFTER], "120");

        let body = body_of(response).await;
        assert_eq!(body["code"], "ACCOUNT_LOCKED");
        assert_eq!(body["retryAfterSeconds"], 120);
    }

    #[tokio::test]
    async fn test_server_error_hides_cause() {
        let response = AuthError::Internal("connection refused on 10.0.0.5".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_of(response).await;
        assert_eq!(body["error"], "Internal server error");
        assert_eq!(body["code"], "INTERNAL_ERROR");
        assert!(body["requestId"].is_string());
        assert!(!body.to_string().contains("10.0.0.5"));
    }

    #[tokio::test]
    async fn test_weak_password_details() {
        let response = AuthError::WeakPassword(vec![
            "Password must contain at least one number".to_string(),
        ])
        .into_response();
        let body = body_of(response).await;

        assert_eq!(body["code"], "WEAK_PASSWORD");
        assert_eq!(body["details"][0], "Password must contain at least one number");
    }
}
