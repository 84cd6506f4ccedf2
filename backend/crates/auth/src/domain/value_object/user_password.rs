//! Account password: what a user types, and what is stored for them
//!
//! Hashing and normalisation live in `platform::password`; this module maps
//! their failures onto [`AuthError`] for the login, signup and reset flows.
//!
//! ```rust
//! use auth::domain::value_object::user_password::{UserPassword, RawPassword};
//! use platform::password::PasswordPolicy;
//!
//! // New password: strength rules apply
//! let raw = RawPassword::new_strong("MySecurePass123".to_string(), &PasswordPolicy::default()).unwrap();
//!
//! // Hash for storage
//! let hashed = UserPassword::from_raw(&raw, None).unwrap();
//!
//! // Verify later
//! assert!(hashed.verify(&raw, None));
//! ```

use platform::password::{
    ClearTextPassword, HashedPassword, PasswordPolicy, PasswordPolicyError,
};
use std::fmt;

use crate::error::{AuthError, AuthResult};

// ============================================================================
// Raw Password (User Input)
// ============================================================================

/// Raw password from user input
///
/// Wrapper around `ClearTextPassword` with domain-specific error handling.
/// Memory is automatically zeroized when dropped.
pub struct RawPassword(ClearTextPassword);

impl RawPassword {
    /// Password submitted for login.
    ///
    /// Structural failures are reported as `InvalidCredentials` so a login
    /// response never reveals which rule a guess broke.
    pub fn new(raw: String) -> AuthResult<Self> {
        ClearTextPassword::new(raw)
            .map(Self)
            .map_err(|_| AuthError::InvalidCredentials)
    }

    /// Password about to be stored (signup, reset)
    ///
    /// ## Errors
    /// `WeakPassword` listing every unmet rule, or `Validation` for
    /// structural problems.
    pub fn new_strong(raw: String, policy: &PasswordPolicy) -> AuthResult<Self> {
        ClearTextPassword::new_with_policy(raw, policy)
            .map(Self)
            .map_err(|e| match e {
                PasswordPolicyError::Weak(unmet) => {
                    AuthError::WeakPassword(unmet.iter().map(ToString::to_string).collect())
                }
                other => AuthError::Validation(other.to_string()),
            })
    }

    /// Access the inner ClearTextPassword
    pub(crate) fn inner(&self) -> &ClearTextPassword {
        &self.0
    }

    /// [`UserPassword::from_raw`] on the blocking pool
    pub async fn hash_blocking(self, pepper: Option<Vec<u8>>) -> AuthResult<UserPassword> {
        blocking(move || UserPassword::from_raw(&self, pepper.as_deref())).await
    }
}

impl fmt::Debug for RawPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RawPassword").field(&"[REDACTED]").finish()
    }
}

// ============================================================================
// User Password (Hashed, for storage)
// ============================================================================

/// Hashed user password for database storage
///
/// Stores password in Argon2id PHC string format.
#[derive(Clone, PartialEq, Eq)]
pub struct UserPassword(HashedPassword);

impl UserPassword {
    /// Create from raw password by hashing
    pub fn from_raw(raw: &RawPassword, pepper: Option<&[u8]>) -> AuthResult<Self> {
        raw.inner()
            .hash(pepper)
            .map(Self)
            .map_err(|e| AuthError::Internal(e.to_string()))
    }

    /// Create from PHC string (from database)
    pub fn from_phc_string(phc_string: impl Into<String>) -> AuthResult<Self> {
        HashedPassword::from_phc_string(phc_string)
            .map(Self)
            .map_err(|_| AuthError::Internal("Invalid password hash in database".to_string()))
    }

    /// Get PHC string for database storage
    pub fn as_phc_string(&self) -> &str {
        self.0.as_phc_string()
    }

    /// Verify a raw password against this hash
    ///
    /// `pepper` must match the pepper used during hashing.
    pub fn verify(&self, raw: &RawPassword, pepper: Option<&[u8]>) -> bool {
        self.0.verify(raw.inner(), pepper)
    }

    /// [`Self::verify`] on the blocking pool
    pub async fn verify_blocking(
        &self,
        raw: RawPassword,
        pepper: Option<Vec<u8>>,
    ) -> AuthResult<bool> {
        let hash = self.clone();
        blocking(move || Ok(hash.verify(&raw, pepper.as_deref()))).await
    }
}

/// Argon2 is CPU-bound; keep it off the async workers.
pub(crate) async fn blocking<T, F>(work: F) -> AuthResult<T>
where
    F: FnOnce() -> AuthResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AuthError::Internal(format!("Password task failed: {e}")))?
}

impl fmt::Debug for UserPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserPassword")
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

    fn strong(raw: &str) -> RawPassword {
        RawPassword::new_strong(raw.to_string(), &PasswordPolicy::default()).unwrap()
    }

    #[test]
    fn test_weak_password_lists_rules() {
        let err = RawPassword::new_strong("short".to_string(), &PasswordPolicy::default())
            .unwrap_err();
        let AuthError::WeakPassword(details) = err else {
            panic!("expected WeakPassword");
        };
        assert_eq!(
            details,
            vec![
                "Password must be at least 8 characters long".to_string(),
                "Password must contain at least one uppercase letter".to_string(),
                "Password must contain at least one number".to_string(),
            ]
        );
    }

    #[test]
    fn test_login_password_hides_rule() {
        assert!(matches!(
            RawPassword::new("   ".to_string()),
            Err(AuthError::InvalidCredentials)
        ));
        // Login does not apply strength rules.
        assert!(RawPassword::new("weak".to_string()).is_ok());
    }

    #[test]
    fn test_hash_and_verify() {
        let raw = strong("TestPassword123");
        let hashed = UserPassword::from_raw(&raw, None).unwrap();

        assert!(hashed.verify(&raw, None));

        let wrong = strong("WrongPassword123");
        assert!(!hashed.verify(&wrong, None));
    }

    #[test]
    fn test_reset_to_same_password_detected() {
        let current = UserPassword::from_raw(&strong("Harbour2024"), None).unwrap();
        assert!(current.verify(&strong("Harbour2024"), None));
        assert!(!current.verify(&strong("Harbour2025"), None));
    }

    #[tokio::test]
    async fn test_blocking_hash_and_verify() {
        let pepper = Some(b"pepper".to_vec());
        let hashed = strong("Harbour2024")
            .hash_blocking(pepper.clone())
            .await
            .unwrap();

        assert!(hashed.verify_blocking(strong("Harbour2024"), pepper.clone()).await.unwrap());
        assert!(!hashed.verify_blocking(strong("Harbour2024"), None).await.unwrap());
    }

    #[test]
    fn test_phc_string_roundtrip() {
        let raw = strong("TestPassword123");
        let hashed = UserPassword::from_raw(&raw, None).unwrap();

        let restored = UserPassword::from_phc_string(hashed.as_phc_string()).unwrap();
        assert!(restored.verify(&raw, None));
    }
}
