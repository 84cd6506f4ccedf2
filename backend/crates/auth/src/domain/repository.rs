//! Repository Traits
//!
//! Interfaces for data persistence. Implementation is in infrastructure layer.
//!
//! Several operations take a [`Delivery`]: a mail send that must succeed for
//! the write to stick. Implementations await it inside their transaction and
//! roll back when it fails.

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::entity::{
    auth_session::AuthSession, refresh_token::RefreshTokenRecord, user::User,
};
use crate::domain::value_object::{email::Email, one_time_code::OneTimeCode, user_id::UserId};
use crate::domain::value_object::user_password::UserPassword;
use crate::error::AuthResult;

/// Side effect awaited before commit
pub type Delivery<'a> = Pin<Box<dyn Future<Output = AuthResult<()>> + Send + 'a>>;

/// Checks a locked account row and produces the new password hash.
pub type PasswordResetCheck<'a> = &'a (dyn Fn(&User) -> AuthResult<UserPassword> + Sync);

/// User repository trait
#[trait_variant::make(UserRepository: Send)]
pub trait LocalUserRepository {
    /// Find user by ID
    async fn find_by_id(&self, user_id: &UserId) -> AuthResult<Option<User>>;

    /// Find user by normalized email
    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<User>>;

    /// Insert an account (Google signup)
    async fn create(&self, user: &User) -> AuthResult<()>;

    /// Insert an inactive email account, replacing a stale inactive row for
    /// the same email, and deliver its activation mail in one transaction.
    ///
    /// Fails with `EmailExists` when an active row holds the email.
    async fn create_pending(&self, user: &User, deliver: Delivery<'_>) -> AuthResult<()>;

    /// Consume a matching, unexpired activation code of an email account.
    ///
    /// Returns `None` when nothing matched; the caller explains why.
    async fn activate(
        &self,
        email: &Email,
        code: &OneTimeCode,
        now: DateTime<Utc>,
    ) -> AuthResult<Option<User>>;

    /// Overwrite the activation code with the one on `user`, delivering in
    /// the same transaction.
    async fn store_activation_code(&self, user: &User, deliver: Delivery<'_>) -> AuthResult<()>;

    /// Overwrite the reset code with the one on `user`, delivering in the
    /// same transaction.
    async fn store_reset_code(&self, user: &User, deliver: Delivery<'_>) -> AuthResult<()>;

    /// Persist `login_attempts`, `last_login` and `last_failed_attempt_at`
    async fn save_login_state(&self, user: &User) -> AuthResult<()>;

    /// Persist `google_id` and `last_login`
    async fn link_google(&self, user: &User) -> AuthResult<()>;

    /// Lock the row for `email`, run `check`, store the returned hash,
    /// consume the reset code and revoke the account's refresh tokens.
    async fn reset_password(
        &self,
        email: &Email,
        check: PasswordResetCheck<'_>,
    ) -> AuthResult<User>;
}

/// Auth session repository trait
#[trait_variant::make(AuthSessionRepository: Send)]
pub trait LocalAuthSessionRepository {
    /// Create a new session
    async fn create(&self, session: &AuthSession) -> AuthResult<()>;

    /// Find session by ID
    async fn find_by_id(&self, session_id: Uuid) -> AuthResult<Option<AuthSession>>;

    /// Update session data, expiry and last activity
    async fn update(&self, session: &AuthSession) -> AuthResult<()>;

    /// Delete a session
    async fn delete(&self, session_id: Uuid) -> AuthResult<()>;

    /// Delete all sessions for a user
    async fn delete_all_for_user(&self, user_id: &UserId) -> AuthResult<u64>;

    /// Clean up expired sessions
    async fn cleanup_expired(&self) -> AuthResult<u64>;
}

/// Refresh token allow-list
#[trait_variant::make(RefreshTokenRepository: Send)]
pub trait LocalRefreshTokenRepository {
    async fn insert(&self, record: &RefreshTokenRecord) -> AuthResult<()>;

    /// Replace `old_token` with `next` atomically.
    ///
    /// Returns `false` (and writes nothing) unless `old_token` exists,
    /// belongs to `next.user_id` and is unexpired at `now`.
    async fn rotate(
        &self,
        old_token: &str,
        next: &RefreshTokenRecord,
        now: DateTime<Utc>,
    ) -> AuthResult<bool>;

    async fn revoke(&self, token: &str) -> AuthResult<()>;

    async fn revoke_all_for_user(&self, user_id: &UserId) -> AuthResult<u64>;

    /// Clean up expired tokens
    async fn cleanup_expired(&self) -> AuthResult<u64>;
}

/// Everything the auth handlers need from storage
pub trait AuthRepository:
    UserRepository + AuthSessionRepository + RefreshTokenRepository + Send + Sync + 'static
{
}

impl<T> AuthRepository for T where
    T: UserRepository + AuthSessionRepository + RefreshTokenRepository + Send + Sync + 'static
{
}
