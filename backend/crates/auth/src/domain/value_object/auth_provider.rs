//! Auth Provider Value Object
//!
//! Every account is bound to exactly one way of proving identity.

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};

/// Credential provider of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    /// Email + password
    #[display("email")]
    Email,
    /// Google OAuth
    #[display("google")]
    Google,
}

impl AuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthProvider::Email => "email",
            AuthProvider::Google => "google",
        }
    }

    /// Create from database value
    pub fn from_db(value: &str) -> AuthResult<Self> {
        match value {
            "email" => Ok(AuthProvider::Email),
            "google" => Ok(AuthProvider::Google),
            other => Err(AuthError::Internal(format!(
                "Unknown auth provider in database: {other}"
            ))),
        }
    }
}
