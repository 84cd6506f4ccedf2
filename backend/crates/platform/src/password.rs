//! Password Hashing, Verification and Strength Policy
//!
//! - Argon2id hashing (memory-hard, recommended by OWASP)
//! - Zeroization of clear-text input
//! - Unicode NFKC normalization before hashing or checking
//! - Strength rules that report every unmet requirement individually

use std::fmt;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use rand::rngs::OsRng;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;
use zeroize::{Zeroize, ZeroizeOnDrop};

// ============================================================================
// Constants
// ============================================================================

/// Minimum password length
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length (bounds hashing cost)
pub const MAX_PASSWORD_LENGTH: usize = 128;

// ============================================================================
// Error Types
// ============================================================================

/// One strength rule a candidate password does not satisfy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordRequirement {
    MinLength(usize),
    Uppercase,
    Lowercase,
    Digit,
}

impl fmt::Display for PasswordRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PasswordRequirement::MinLength(min) => {
                write!(f, "Password must be at least {min} characters long")
            }
            PasswordRequirement::Uppercase => {
                write!(f, "Password must contain at least one uppercase letter")
            }
            PasswordRequirement::Lowercase => {
                write!(f, "Password must contain at least one lowercase letter")
            }
            PasswordRequirement::Digit => write!(f, "Password must contain at least one number"),
        }
    }
}

/// Password policy violation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordPolicyError {
    /// Password contains only whitespace
    #[error("Password cannot be empty or contain only whitespace")]
    EmptyOrWhitespace,

    /// Password is too long
    #[error("Password must be at most {max} characters (got {actual})")]
    TooLong { max: usize, actual: usize },

    /// Password contains invalid characters (control characters)
    #[error("Password contains invalid control characters")]
    InvalidCharacter,

    /// Password misses one or more strength requirements
    #[error("Password does not meet the strength requirements")]
    Weak(Vec<PasswordRequirement>),
}

/// Password hashing/verification errors
#[derive(Debug, Error)]
pub enum PasswordHashError {
    /// Hashing operation failed
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    /// Invalid hash format
    #[error("Invalid password hash format")]
    InvalidHashFormat,
}

// ============================================================================
// Strength policy
// ============================================================================

/// Strength rules applied to new passwords (signup, reset)
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_digit: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: MIN_PASSWORD_LENGTH,
            require_uppercase: true,
            require_lowercase: true,
            require_digit: true,
        }
    }
}

impl PasswordPolicy {
    /// Every requirement `password` misses, in a stable order
    pub fn unmet(&self, password: &str) -> Vec<PasswordRequirement> {
        let mut unmet = Vec::new();

        if password.chars().count() < self.min_length {
            unmet.push(PasswordRequirement::MinLength(self.min_length));
        }
        if self.require_uppercase && !password.chars().any(char::is_uppercase) {
            unmet.push(PasswordRequirement::Uppercase);
        }
        if self.require_lowercase && !password.chars().any(char::is_lowercase) {
            unmet.push(PasswordRequirement::Lowercase);
        }
        if self.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            unmet.push(PasswordRequirement::Digit);
        }

        unmet
    }
}

// ============================================================================
// Clear Text Password (Zeroized on drop)
// ============================================================================

/// Clear text password with automatic memory zeroization
///
/// ## Security
/// - Implements `Zeroize` and `ZeroizeOnDrop`
/// - Does not implement `Clone` to prevent accidental copies
/// - Debug output is redacted
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ClearTextPassword(String);

impl ClearTextPassword {
    /// Accept a password for verification.
    ///
    /// Only structural checks apply here (non-empty, bounded, no control
    /// characters); strength rules are for passwords being set.
    pub fn new(raw: String) -> Result<Self, PasswordPolicyError> {
        let mut raw = raw;
        let normalized: String = raw.nfkc().collect();
        raw.zeroize();

        if normalized.trim().is_empty() {
            return Err(PasswordPolicyError::EmptyOrWhitespace);
        }

        let char_count = normalized.chars().count();
        if char_count > MAX_PASSWORD_LENGTH {
            return Err(PasswordPolicyError::TooLong {
                max: MAX_PASSWORD_LENGTH,
                actual: char_count,
            });
        }

        // Control characters other than tab and newline are rejected.
        if normalized
            .chars()
            .any(|ch| ch.is_control() && ch != '\t' && ch != '\n')
        {
            return Err(PasswordPolicyError::InvalidCharacter);
        }

        Ok(Self(normalized))
    }

    /// Accept a password that is about to be stored.
    pub fn new_with_policy(raw: String, policy: &PasswordPolicy) -> Result<Self, PasswordPolicyError> {
        let password = Self::new(raw)?;

        let unmet = policy.unmet(&password.0);
        if !unmet.is_empty() {
            return Err(PasswordPolicyError::Weak(unmet));
        }

        Ok(password)
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    fn peppered(&self, pepper: Option<&[u8]>) -> Vec<u8> {
        let mut bytes = self.as_bytes().to_vec();
        if let Some(p) = pepper {
            bytes.extend_from_slice(p);
        }
        bytes
    }

    /// Hash the password using Argon2id
    pub fn hash(&self, pepper: Option<&[u8]>) -> Result<HashedPassword, PasswordHashError> {
        let mut password_bytes = self.peppered(pepper);

        // 128-bit salt
        let salt = SaltString::generate(&mut OsRng);

        // OWASP recommended Argon2id parameters:
        // m=19456 (19 MiB), t=2, p=1
        let result = Argon2::default()
            .hash_password(&password_bytes, &salt)
            .map(|hash| HashedPassword {
                hash: hash.to_string(),
            })
            .map_err(|e| PasswordHashError::HashingFailed(e.to_string()));

        password_bytes.zeroize();
        result
    }
}

impl fmt::Debug for ClearTextPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClearTextPassword")
            .field(&"[REDACTED]")
            .finish()
    }
}

// ============================================================================
// Hashed Password (Safe to store)
// ============================================================================

/// Hashed password in PHC string format
#[derive(Clone, PartialEq, Eq)]
pub struct HashedPassword {
    hash: String,
}

impl HashedPassword {
    /// Create from PHC string (e.g., from database)
    pub fn from_phc_string(s: impl Into<String>) -> Result<Self, PasswordHashError> {
        let hash = s.into();

        PasswordHash::new(&hash).map_err(|_| PasswordHashError::InvalidHashFormat)?;

        Ok(Self { hash })
    }

    /// Get the PHC string for storage
    pub fn as_phc_string(&self) -> &str {
        &self.hash
    }

    /// Verify a password against this hash
    ///
    /// Argon2 compares digests in constant time.
    pub fn verify(&self, password: &ClearTextPassword, pepper: Option<&[u8]>) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(&self.hash) else {
            return false;
        };

        let mut password_bytes = password.peppered(pepper);
        let valid = Argon2::default()
            .verify_password(&password_bytes, &parsed_hash)
            .is_ok();
        password_bytes.zeroize();

        valid
    }
}

impl fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashedPassword")
            .field("hash", &"[HASH]")
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_empty() {
        let result = ClearTextPassword::new("   ".to_string());
        assert!(matches!(
            result,
            Err(PasswordPolicyError::EmptyOrWhitespace)
        ));
    }

    #[test]
    fn test_password_too_long() {
        let result = ClearTextPassword::new("a".repeat(MAX_PASSWORD_LENGTH + 1));
        assert!(matches!(result, Err(PasswordPolicyError::TooLong { .. })));
    }

    #[test]
    fn test_control_characters_rejected() {
        let result = ClearTextPassword::new("Abcdef12\u{0007}".to_string());
        assert!(matches!(result, Err(PasswordPolicyError::InvalidCharacter)));
    }

    #[test]
    fn test_weak_password_lists_each_requirement() {
        let result = ClearTextPassword::new_with_policy("abc".to_string(), &PasswordPolicy::default());
        let Err(PasswordPolicyError::Weak(unmet)) = result else {
            panic!("expected weak password error");
        };
        assert_eq!(
            unmet,
            vec![
                PasswordRequirement::MinLength(MIN_PASSWORD_LENGTH),
                PasswordRequirement::Uppercase,
                PasswordRequirement::Digit,
            ]
        );
    }

    #[test]
    fn test_strong_password_accepted() {
        let policy = PasswordPolicy::default();
        assert!(ClearTextPassword::new_with_policy("Abcdef12".to_string(), &policy).is_ok());
        assert!(policy.unmet("Abcdef12").is_empty());
    }

    #[test]
    fn test_requirement_messages() {
        assert_eq!(
            PasswordRequirement::MinLength(8).to_string(),
            "Password must be at least 8 characters long"
        );
        assert_eq!(
            PasswordRequirement::Digit.to_string(),
            "Password must contain at least one number"
        );
    }

    #[test]
    fn test_hash_and_verify() {
        let password = ClearTextPassword::new("TestPassword123!".to_string()).unwrap();
        let hashed = password.hash(None).unwrap();
        assert!(hashed.verify(&password, None));

        let wrong = ClearTextPassword::new("WrongPassword123!".to_string()).unwrap();
        assert!(!hashed.verify(&wrong, None));
    }

    #[test]
    fn test_hash_with_pepper() {
        let password = ClearTextPassword::new("TestPassword123!".to_string()).unwrap();
        let pepper = b"my_secret_pepper";
        let hashed = password.hash(Some(pepper)).unwrap();

        assert!(hashed.verify(&password, Some(pepper)));
        assert!(!hashed.verify(&password, None));
        assert!(!hashed.verify(&password, Some(b"wrong_pepper")));
    }

    #[test]
    fn test_nfkc_normalization() {
        // Full-width digits normalize to ASCII, so both spellings verify.
        let full_width = ClearTextPassword::new("Abcdef１２".to_string()).unwrap();
        let ascii = ClearTextPassword::new("Abcdef12".to_string()).unwrap();
        let hashed = full_width.hash(None).unwrap();
        assert!(hashed.verify(&ascii, None));
    }

    #[test]
    fn test_invalid_phc_string() {
        assert!(HashedPassword::from_phc_string("not_a_valid_hash").is_err());
    }

    #[test]
    fn test_debug_redaction() {
        let password = ClearTextPassword::new("secret-value".to_string()).unwrap();
        let debug_output = format!("{:?}", password);
        assert!(debug_output.contains("REDACTED"));
        assert!(!debug_output.contains("secret"));
    }
}
