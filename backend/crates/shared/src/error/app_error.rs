//! Application Error - Unified error type for the application
//!
//! Defines [`AppError`] struct and [`AppResult<T>`] type alias.

use std::borrow::Cow;
use std::error::Error;
use std::fmt;

use serde_json::{Map, Value};
use uuid::Uuid;

use super::kind::ErrorKind;

/// Every failure that reaches an HTTP client is rendered from this type as
/// `{ "success": false, "error": <message>, "code": <MACHINE_CODE>, ...details }`.
///
/// ## Fields
/// * `kind` - class, decides the HTTP status
/// * `code` - machine-readable code the frontend branches on
/// * `message` - text shown to the user (hidden for 5xx)
/// * `details` - extra top-level JSON fields (`provider`, `remainingSeconds`, ...)
/// * `request_id` - correlation id attached to server errors
/// * `source` - underlying cause, for logs only
///
/// ## Examples
/// ```rust
/// use kernel::error::{app_error::AppError, kind::ErrorKind};
///
/// let err = AppError::new(ErrorKind::BadRequest, "Invalid email format")
///     .with_code("INVALID_EMAIL");
/// assert_eq!(err.code(), "INVALID_EMAIL");
///
/// let err = AppError::bad_request("Please use Google sign-in")
///     .with_code("AUTH_PROVIDER_MISMATCH")
///     .with_detail("provider", "google");
/// assert_eq!(err.detail("provider").and_then(|v| v.as_str()), Some("google"));
/// ```
pub struct AppError {
    kind: ErrorKind,
    code: Option<Cow<'static, str>>,
    message: Cow<'static, str>,
    details: Map<String, Value>,
    request_id: Option<Uuid>,
    source: Option<Box<dyn Error + Send + Sync + 'static>>,
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    #[inline]
    pub fn new(kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            code: None,
            message: message.into(),
            details: Map::new(),
            request_id: None,
            source: None,
        }
    }

    // ========================================================================
    // Convenience constructors
    // ========================================================================

    #[inline]
    pub fn bad_request(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    #[inline]
    pub fn unauthorized(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    #[inline]
    pub fn forbidden(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    #[inline]
    pub fn not_found(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    #[inline]
    pub fn conflict(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    #[inline]
    pub fn too_many_requests(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::TooManyRequests, message)
    }

    #[inline]
    pub fn internal(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::InternalServerError, message)
    }

    /// Dependency down (database, relay)
    #[inline]
    pub fn service_unavailable(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::ServiceUnavailable, message)
    }

    // ========================================================================
    // Builder methods
    // ========================================================================

    /// Override the machine code derived from the kind.
    #[inline]
    pub fn with_code(mut self, code: impl Into<Cow<'static, str>>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Add a top-level field to the response body.
    ///
    /// `success`, `error` and `code` are reserved and silently ignored.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if !matches!(key.as_str(), "success" | "error" | "code") {
            self.details.insert(key, value.into());
        }
        self
    }

    /// Attach the correlation id that was logged next to the cause.
    #[inline]
    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = Some(request_id);
        self
    }

    #[inline]
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[inline]
    pub fn status_code(&self) -> u16 {
        self.kind.status_code()
    }

    /// Machine code, falling back to the kind's default.
    #[inline]
    pub fn code(&self) -> &str {
        self.code.as_deref().unwrap_or(self.kind.default_code())
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Look up one extra body field.
    #[inline]
    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details.get(key)
    }

    #[inline]
    pub fn request_id(&self) -> Option<Uuid> {
        self.request_id
    }

    #[inline]
    pub fn is_server_error(&self) -> bool {
        self.kind.is_server_error()
    }

    /// Render the JSON body sent to clients.
    ///
    /// Server errors never expose their message: the body carries a generic
    /// text plus the request id instead.
    pub fn to_body(&self) -> Value {
        let mut body = Map::new();
        body.insert("success".into(), Value::Bool(false));

        if self.is_server_error() {
            body.insert("error".into(), Value::from("Internal server error"));
        } else {
            body.insert("error".into(), Value::from(self.message()));
        }
        body.insert("code".into(), Value::from(self.code()));

        for (key, value) in &self.details {
            body.insert(key.clone(), value.clone());
        }

        if let Some(request_id) = self.request_id {
            body.insert("requestId".into(), Value::from(request_id.to_string()));
        }

        Value::Object(body)
    }
}

impl fmt::Debug for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = f.debug_struct("AppError");
        builder.field("kind", &self.kind);
        builder.field("code", &self.code());
        builder.field("message", &self.message);
        if !self.details.is_empty() {
            builder.field("details", &self.details);
        }
        if let Some(request_id) = &self.request_id {
            builder.field("request_id", request_id);
        }
        if let Some(source) = &self.source {
            builder.field("source", source);
        }
        builder.finish()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}
