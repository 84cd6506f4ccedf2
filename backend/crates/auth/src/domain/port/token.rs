//! Token issuing port
//!
//! Access and refresh tokens are stateless signed tokens; refresh tokens are
//! additionally allow-listed in storage.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entity::user::User;
use crate::domain::value_object::user_id::UserId;
use crate::error::AuthResult;

/// Access token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    /// User ID
    pub sub: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub iat: i64,
    pub exp: i64,
}

/// Refresh token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// User ID
    pub sub: String,
    /// Unique per token, so two refreshes in the same second differ
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone)]
pub struct IssuedRefreshToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies tokens. Access and refresh tokens use separate keys.
pub trait TokenIssuer: Send + Sync {
    fn issue_access(&self, user: &User, ttl: Duration) -> AuthResult<String>;

    fn verify_access(&self, token: &str) -> AuthResult<AccessClaims>;

    fn issue_refresh(&self, user_id: &UserId) -> AuthResult<IssuedRefreshToken>;

    fn verify_refresh(&self, token: &str) -> AuthResult<RefreshClaims>;
}
