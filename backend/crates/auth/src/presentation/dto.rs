//! API DTOs (Data Transfer Objects)
//!
//! Request fields default to empty so that absent fields surface as
//! `MISSING_FIELDS` instead of a deserialization rejection.

use serde::{Deserialize, Serialize};

use crate::domain::entity::auth_session::SessionUser;
use crate::domain::entity::user::User;

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SignUpRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ActivateRequest {
    pub email: String,
    pub code: String,
}

/// Body of `/resend-code`, `/forgot-password` and `/resend-reset-code`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: String,
    pub code: String,
    pub new_password: String,
}

/// `GET /auth/google?intent=signup|login`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoogleStartQuery {
    pub intent: Option<String>,
}

impl GoogleStartQuery {
    pub fn is_signup(&self) -> bool {
        self.intent.as_deref() == Some("signup")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoogleCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

// ============================================================================
// Responses
// ============================================================================

/// Public account profile
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub auth_provider: String,
    pub is_active: bool,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.user_id.to_string(),
            email: user.email.as_str().to_string(),
            first_name: user.first_name.as_str().to_string(),
            last_name: user.last_name.as_str().to_string(),
            auth_provider: user.auth_provider.as_str().to_string(),
            is_active: user.is_active,
        }
    }
}

impl From<SessionUser> for UserResponse {
    fn from(user: SessionUser) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            auth_provider: user.auth_provider.as_str().to_string(),
            is_active: user.is_active,
        }
    }
}

/// Login and activation response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub success: bool,
    pub user: UserResponse,
    pub token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpResponse {
    pub success: bool,
    pub message: String,
    pub redirect: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserResponse>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub success: bool,
    pub token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub user: UserResponse,
}
