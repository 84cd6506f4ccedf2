//! One-Time Code Value Object
//!
//! Six-digit codes mailed for account activation and password reset.

use std::fmt;

use platform::crypto::{constant_time_eq, random_digits};

use crate::error::{AuthError, AuthResult};

/// Number of digits in every code
pub const CODE_LENGTH: usize = 6;

/// Activation or reset code
#[derive(Clone, PartialEq, Eq)]
pub struct OneTimeCode(String);

impl OneTimeCode {
    /// Fresh code from the OS RNG
    pub fn generate() -> Self {
        Self(random_digits(CODE_LENGTH))
    }

    /// Parse a submitted code. Surrounding whitespace is ignored.
    pub fn parse(raw: &str) -> AuthResult<Self> {
        let code = raw.trim();

        if code.len() != CODE_LENGTH || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AuthError::InvalidCode);
        }

        Ok(Self(code.to_string()))
    }

    /// Create from database value
    pub fn from_db(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Constant-time comparison against a stored code
    pub fn matches(&self, other: &OneTimeCode) -> bool {
        constant_time_eq(self.0.as_bytes(), other.0.as_bytes())
    }
}

impl fmt::Debug for OneTimeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OneTimeCode").field(&"[REDACTED]").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_six_digits() {
        for _ in 0..20 {
            let code = OneTimeCode::generate();
            assert_eq!(code.as_str().len(), CODE_LENGTH);
            assert!(OneTimeCode::parse(code.as_str()).is_ok());
        }
    }

    #[test]
    fn test_parse_trims() {
        let code = OneTimeCode::parse(" 012345\n").unwrap();
        assert_eq!(code.as_str(), "012345");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for raw in ["", "12345", "1234567", "12a456", "12 456"] {
            assert!(matches!(
                OneTimeCode::parse(raw),
                Err(AuthError::InvalidCode)
            ));
        }
    }

    #[test]
    fn test_matches() {
        let stored = OneTimeCode::from_db("424242");
        assert!(OneTimeCode::parse("424242").unwrap().matches(&stored));
        assert!(!OneTimeCode::parse("424243").unwrap().matches(&stored));
    }

    #[test]
    fn test_debug_redaction() {
        let code = OneTimeCode::from_db("987654");
        assert!(!format!("{code:?}").contains("987654"));
    }
}
