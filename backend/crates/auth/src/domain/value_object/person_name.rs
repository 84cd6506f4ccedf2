//! Person Name Value Object
//!
//! First or last name as entered at signup or returned by Google.

use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};

const NAME_MAX_LENGTH: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonName(String);

impl PersonName {
    /// Trimmed, non-blank, at most 100 characters, no control characters
    pub fn new(raw: &str) -> AuthResult<Self> {
        let name = raw.trim();

        if name.is_empty() {
            return Err(AuthError::Validation("Name cannot be empty".to_string()));
        }
        if name.chars().count() > NAME_MAX_LENGTH {
            return Err(AuthError::Validation(format!(
                "Name must be at most {NAME_MAX_LENGTH} characters"
            )));
        }
        if name.chars().any(char::is_control) {
            return Err(AuthError::Validation(
                "Name contains invalid characters".to_string(),
            ));
        }

        Ok(Self(name.to_string()))
    }

    /// Lenient constructor for provider-supplied names, which may be absent.
    pub fn from_provider(raw: Option<&str>) -> Self {
        raw.and_then(|n| Self::new(n).ok())
            .unwrap_or_else(|| Self(String::new()))
    }

    /// Create from database value
    pub fn from_db(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PersonName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
