//! User Entity
//!
//! One row per account. Credential, activation, reset and lockout
//! bookkeeping all live on the account itself.

use chrono::{DateTime, Duration, Utc};

use crate::domain::value_object::{
    auth_provider::AuthProvider, email::Email, one_time_code::OneTimeCode,
    person_name::PersonName, user_id::UserId, user_password::UserPassword,
};
use crate::error::{AuthError, AuthResult};

/// User entity
#[derive(Debug, Clone)]
pub struct User {
    /// Internal UUID identifier
    pub user_id: UserId,
    /// Normalized email (unique)
    pub email: Email,
    pub first_name: PersonName,
    pub last_name: PersonName,
    /// Argon2id hash; only email accounts carry one
    pub password: Option<UserPassword>,
    /// The single provider this account signs in with
    pub auth_provider: AuthProvider,
    pub is_active: bool,
    pub activation_code: Option<OneTimeCode>,
    pub activation_expiry: Option<DateTime<Utc>>,
    pub reset_code: Option<OneTimeCode>,
    pub reset_code_expires_at: Option<DateTime<Utc>>,
    /// Consecutive failed logins inside the current window
    pub login_attempts: i32,
    /// Last successful login time
    pub last_login: Option<DateTime<Utc>>,
    /// Lockout windows are measured from here
    pub last_failed_attempt_at: Option<DateTime<Utc>>,
    /// Google `sub` once linked
    pub google_id: Option<String>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Inactive email account awaiting its activation code
    pub fn new_pending(
        email: Email,
        first_name: PersonName,
        last_name: PersonName,
        password: UserPassword,
        activation_code: OneTimeCode,
        code_ttl: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: UserId::new(),
            email,
            first_name,
            last_name,
            password: Some(password),
            auth_provider: AuthProvider::Email,
            is_active: false,
            activation_code: Some(activation_code),
            activation_expiry: Some(now + code_ttl),
            reset_code: None,
            reset_code_expires_at: None,
            login_attempts: 0,
            last_login: None,
            last_failed_attempt_at: None,
            google_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Active Google account created on first federated signup
    pub fn new_google(
        email: Email,
        first_name: PersonName,
        last_name: PersonName,
        google_id: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: UserId::new(),
            email,
            first_name,
            last_name,
            password: None,
            auth_provider: AuthProvider::Google,
            is_active: true,
            activation_code: None,
            activation_expiry: None,
            reset_code: None,
            reset_code_expires_at: None,
            login_attempts: 0,
            last_login: Some(now),
            last_failed_attempt_at: None,
            google_id: Some(google_id),
            created_at: now,
            updated_at: now,
        }
    }

    /// Fail with `ProviderMismatch` unless the account uses `expected`.
    pub fn ensure_provider(&self, expected: AuthProvider) -> AuthResult<()> {
        if self.auth_provider == expected {
            Ok(())
        } else {
            Err(AuthError::ProviderMismatch(self.auth_provider))
        }
    }

    /// Time left on a lockout, if the account is locked at `now`.
    pub fn lockout_remaining(
        &self,
        max_attempts: i32,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Option<Duration> {
        if self.login_attempts < max_attempts {
            return None;
        }

        let unlock_at = self.last_failed_attempt_at? + window;
        (unlock_at > now).then(|| unlock_at - now)
    }

    /// Count a failed login. A failure after the window has passed starts
    /// a new count.
    pub fn record_failed_login(&mut self, window: Duration, now: DateTime<Utc>) {
        let within_window = self
            .last_failed_attempt_at
            .is_some_and(|last| now - last < window);

        self.login_attempts = if within_window {
            self.login_attempts.saturating_add(1)
        } else {
            1
        };
        self.last_failed_attempt_at = Some(now);
        self.updated_at = now;
    }

    /// Record successful login
    pub fn record_login(&mut self, now: DateTime<Utc>) {
        self.login_attempts = 0;
        self.last_failed_attempt_at = None;
        self.last_login = Some(now);
        self.updated_at = now;
    }

    pub fn set_activation_code(&mut self, code: OneTimeCode, ttl: Duration, now: DateTime<Utc>) {
        self.activation_code = Some(code);
        self.activation_expiry = Some(now + ttl);
        self.updated_at = now;
    }

    /// Explain why a submitted activation code was not accepted.
    pub fn activation_failure(&self, code: &OneTimeCode, now: DateTime<Utc>) -> AuthError {
        if let Err(e) = self.ensure_provider(AuthProvider::Email) {
            return e;
        }

        match (&self.activation_code, self.activation_expiry) {
            (Some(stored), Some(expiry)) if code.matches(stored) && expiry <= now => {
                AuthError::CodeExpired
            }
            _ => AuthError::InvalidCode,
        }
    }

    /// Consume the activation code
    pub fn activate(&mut self, now: DateTime<Utc>) {
        self.is_active = true;
        self.activation_code = None;
        self.activation_expiry = None;
        self.updated_at = now;
    }

    pub fn set_reset_code(&mut self, code: OneTimeCode, ttl: Duration, now: DateTime<Utc>) {
        self.reset_code = Some(code);
        self.reset_code_expires_at = Some(now + ttl);
        self.updated_at = now;
    }

    /// Time left on an outstanding reset code
    pub fn reset_code_remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.reset_code.as_ref()?;
        let expires_at = self.reset_code_expires_at?;
        (expires_at > now).then(|| expires_at - now)
    }

    /// Validate a submitted reset code against the stored one
    pub fn check_reset_code(&self, code: &OneTimeCode, now: DateTime<Utc>) -> AuthResult<()> {
        let Some(stored) = &self.reset_code else {
            return Err(AuthError::InvalidCode);
        };
        if !code.matches(stored) {
            return Err(AuthError::InvalidCode);
        }

        match self.reset_code_expires_at {
            Some(expires_at) if expires_at > now => Ok(()),
            _ => Err(AuthError::CodeExpired),
        }
    }

    /// Store a new password and consume the reset code
    pub fn apply_password_reset(&mut self, password: UserPassword, now: DateTime<Utc>) {
        self.password = Some(password);
        self.reset_code = None;
        self.reset_code_expires_at = None;
        self.login_attempts = 0;
        self.last_failed_attempt_at = None;
        self.updated_at = now;
    }

    /// Attach a Google identity to a Google account on login
    pub fn link_google(&mut self, google_id: String, now: DateTime<Utc>) {
        self.google_id = Some(google_id);
        self.last_login = Some(now);
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_object::user_password::RawPassword;
    use platform::password::PasswordPolicy;

    fn pending(now: DateTime<Utc>) -> User {
        let raw =
            RawPassword::new_strong("Password123".to_string(), &PasswordPolicy::default()).unwrap();
        User::new_pending(
            Email::new("ada@example.com").unwrap(),
            PersonName::new("Ada").unwrap(),
            PersonName::new("Lovelace").unwrap(),
            UserPassword::from_raw(&raw, None).unwrap(),
            OneTimeCode::from_db("123456"),
            Duration::minutes(15),
            now,
        )
    }

    #[test]
    fn test_lockout_after_max_attempts() {
        let now = Utc::now();
        let window = Duration::minutes(15);
        let mut user = pending(now);

        for i in 0..5 {
            assert!(user.lockout_remaining(5, window, now).is_none());
            user.record_failed_login(window, now + Duration::seconds(i));
        }

        assert_eq!(user.login_attempts, 5);
        let remaining = user
            .lockout_remaining(5, window, now + Duration::seconds(4))
            .unwrap();
        assert_eq!(remaining, window);

        // Window elapsed: no longer locked.
        assert!(
            user.lockout_remaining(5, window, now + Duration::minutes(16))
                .is_none()
        );
    }

    #[test]
    fn test_failure_outside_window_restarts_count() {
        let now = Utc::now();
        let window = Duration::minutes(15);
        let mut user = pending(now);

        user.record_failed_login(window, now);
        user.record_failed_login(window, now + Duration::minutes(1));
        assert_eq!(user.login_attempts, 2);

        user.record_failed_login(window, now + Duration::minutes(30));
        assert_eq!(user.login_attempts, 1);
    }

    #[test]
    fn test_record_login_resets_attempts() {
        let now = Utc::now();
        let mut user = pending(now);
        user.record_failed_login(Duration::minutes(15), now);

        user.record_login(now);
        assert_eq!(user.login_attempts, 0);
        assert_eq!(user.last_login, Some(now));
    }

    #[test]
    fn test_activation_failure_reasons() {
        let now = Utc::now();
        let user = pending(now);
        let right = OneTimeCode::from_db("123456");
        let wrong = OneTimeCode::from_db("654321");

        assert!(matches!(
            user.activation_failure(&wrong, now),
            AuthError::InvalidCode
        ));
        assert!(matches!(
            user.activation_failure(&right, now + Duration::minutes(16)),
            AuthError::CodeExpired
        ));

        let mut consumed = user.clone();
        consumed.activate(now);
        assert!(matches!(
            consumed.activation_failure(&right, now),
            AuthError::InvalidCode
        ));

        let mut google = user;
        google.auth_provider = AuthProvider::Google;
        assert!(matches!(
            google.activation_failure(&right, now),
            AuthError::ProviderMismatch(AuthProvider::Google)
        ));
    }

    #[test]
    fn test_reset_code_lifecycle() {
        let now = Utc::now();
        let mut user = pending(now);
        let code = OneTimeCode::from_db("111222");

        assert!(matches!(
            user.check_reset_code(&code, now),
            Err(AuthError::InvalidCode)
        ));

        user.set_reset_code(code.clone(), Duration::minutes(15), now);
        assert!(user.reset_code_remaining(now).is_some());
        assert!(user.check_reset_code(&code, now).is_ok());
        assert!(matches!(
            user.check_reset_code(&code, now + Duration::minutes(20)),
            Err(AuthError::CodeExpired)
        ));
        assert!(
            user.reset_code_remaining(now + Duration::minutes(20))
                .is_none()
        );
    }
}
