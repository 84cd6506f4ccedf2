//! Error Kind - Classification of errors
//!
//! [`ErrorKind`] decides the HTTP status and the fallback machine code of
//! an [`AppError`](super::app_error::AppError).

use serde::Serialize;

/// Error class shared by every HTTP-facing crate
///
/// ```rust
/// use kernel::error::kind::ErrorKind;
///
/// let kind = ErrorKind::TooManyRequests;
/// assert_eq!(kind.status_code(), 429);
/// assert_eq!(kind.default_code(), "RATE_LIMITED");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ErrorKind {
    /// Malformed or invalid input, wrong provider, bad code
    BadRequest,
    /// Missing, invalid or expired credentials
    Unauthorized,
    /// Authenticated but not allowed (inactive account, provider-only flow)
    Forbidden,
    NotFound,
    /// Unique constraint, e.g. an email already registered
    Conflict,
    /// Rate limit, lockout or resend cooldown
    TooManyRequests,
    InternalServerError,
    /// Database or mail relay unreachable
    ServiceUnavailable,
}

impl ErrorKind {
    /// (status, default machine code, reason phrase)
    const fn parts(&self) -> (u16, &'static str, &'static str) {
        match self {
            ErrorKind::BadRequest => (400, "VALIDATION_ERROR", "Bad Request"),
            ErrorKind::Unauthorized => (401, "UNAUTHORIZED", "Unauthorized"),
            ErrorKind::Forbidden => (403, "FORBIDDEN", "Forbidden"),
            ErrorKind::NotFound => (404, "NOT_FOUND", "Not Found"),
            ErrorKind::Conflict => (409, "CONFLICT", "Conflict"),
            ErrorKind::TooManyRequests => (429, "RATE_LIMITED", "Too Many Requests"),
            ErrorKind::InternalServerError => (500, "INTERNAL_ERROR", "Internal Server Error"),
            ErrorKind::ServiceUnavailable => (503, "SERVICE_UNAVAILABLE", "Service Unavailable"),
        }
    }

    #[inline]
    pub const fn status_code(&self) -> u16 {
        self.parts().0
    }

    /// Machine code used when no specific code was attached.
    #[inline]
    pub const fn default_code(&self) -> &'static str {
        self.parts().1
    }

    #[inline]
    pub const fn reason(&self) -> &'static str {
        self.parts().2
    }

    /// 5xx: logged with a request id, message hidden from clients.
    #[inline]
    pub const fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.reason())
    }
}
