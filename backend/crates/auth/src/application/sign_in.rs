//! Sign In Use Case
//!
//! Authenticates an email account and issues credentials.

use std::sync::Arc;

use chrono::Utc;

use crate::application::config::{AuthConfig, ceil_secs, span};
use crate::application::credentials::{CredentialIssuer, IssuedCredentials};
use crate::application::session::SessionManager;
use crate::domain::entity::user::User;
use crate::domain::port::TokenIssuer;
use crate::domain::repository::{AuthSessionRepository, RefreshTokenRepository, UserRepository};
use crate::domain::value_object::{
    auth_provider::AuthProvider, email::Email, user_password::RawPassword,
};
use crate::error::{AuthError, AuthResult};

/// Sign in input
pub struct SignInInput {
    pub email: String,
    pub password: String,
}

/// Sign in output
#[derive(Debug)]
pub struct SignInOutput {
    pub user: User,
    pub credentials: IssuedCredentials,
}

/// Sign in use case
pub struct SignInUseCase<U, S, T>
where
    U: UserRepository,
    S: AuthSessionRepository,
    T: RefreshTokenRepository,
{
    user_repo: Arc<U>,
    sessions: SessionManager<S>,
    issuer: CredentialIssuer<S, T>,
    config: Arc<AuthConfig>,
}

impl<U, S, T> SignInUseCase<U, S, T>
where
    U: UserRepository,
    S: AuthSessionRepository,
    T: RefreshTokenRepository,
{
    pub fn new(
        user_repo: Arc<U>,
        session_repo: Arc<S>,
        refresh_repo: Arc<T>,
        tokens: Arc<dyn TokenIssuer>,
        config: Arc<AuthConfig>,
    ) -> Self {
        Self {
            user_repo,
            sessions: SessionManager::new(session_repo.clone(), config.clone()),
            issuer: CredentialIssuer::new(session_repo, refresh_repo, tokens, config.clone()),
            config,
        }
    }

    /// Every outcome that reads the account writes it at most once.
    pub async fn execute(
        &self,
        input: SignInInput,
        current_session: Option<&str>,
    ) -> AuthResult<SignInOutput> {
        let mut missing = Vec::new();
        if input.email.trim().is_empty() {
            missing.push("email");
        }
        if input.password.is_empty() {
            missing.push("password");
        }
        if !missing.is_empty() {
            return Err(AuthError::MissingFields(missing));
        }

        let email = Email::new(&input.email)?;

        let mut user = self
            .user_repo
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        // No password comparison for accounts of another provider.
        user.ensure_provider(AuthProvider::Email)?;

        let now = Utc::now();
        let window = span(self.config.lockout_window);

        if let Some(remaining) =
            user.lockout_remaining(self.config.max_login_attempts, window, now)
        {
            return Err(AuthError::AccountLocked {
                retry_after_secs: ceil_secs(remaining),
            });
        }

        if !user.is_active {
            return Err(AuthError::AccountNotActive);
        }

        let password_valid = match (RawPassword::new(input.password), &user.password) {
            (Ok(raw), Some(hash)) => {
                hash.verify_blocking(raw, self.config.password_pepper.clone())
                    .await?
            }
            _ => false,
        };

        if !password_valid {
            user.record_failed_login(window, now);
            self.user_repo.save_login_state(&user).await?;

            tracing::warn!(
                email = %email.masked(),
                attempts = user.login_attempts,
                "Failed login"
            );
            return Err(AuthError::InvalidCredentials);
        }

        user.record_login(now);
        self.user_repo.save_login_state(&user).await?;

        let previous = self.sessions.load(current_session).await?;
        let credentials = self
            .issuer
            .issue(&user, self.config.access_ttl, previous.as_ref())
            .await?;

        tracing::info!(
            user_id = %user.user_id,
            email = %email.masked(),
            "User signed in"
        );

        Ok(SignInOutput { user, credentials })
    }
}
