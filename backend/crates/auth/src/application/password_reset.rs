//! Password Reset Use Case
//!
//! Request a code, re-send it (with a cooldown), confirm it with a new
//! password. Only email accounts can reset.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::application::config::{AuthConfig, ceil_secs, span};
use crate::application::mail::reset_mail;
use crate::domain::entity::user::User;
use crate::domain::port::Mailer;
use crate::domain::repository::{AuthSessionRepository, UserRepository};
use crate::domain::value_object::{
    auth_provider::AuthProvider,
    email::Email,
    one_time_code::OneTimeCode,
    user_password::{RawPassword, UserPassword, blocking},
};
use crate::error::{AuthError, AuthResult};

pub struct ResetConfirmInput {
    pub email: String,
    pub code: String,
    pub new_password: String,
}

pub struct PasswordResetUseCase<U, S, M>
where
    U: UserRepository,
    S: AuthSessionRepository,
    M: Mailer,
{
    user_repo: Arc<U>,
    session_repo: Arc<S>,
    mailer: Arc<M>,
    config: Arc<AuthConfig>,
}

impl<U, S, M> PasswordResetUseCase<U, S, M>
where
    U: UserRepository,
    S: AuthSessionRepository,
    M: Mailer,
{
    pub fn new(
        user_repo: Arc<U>,
        session_repo: Arc<S>,
        mailer: Arc<M>,
        config: Arc<AuthConfig>,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            mailer,
            config,
        }
    }

    /// Issue a fresh code, replacing any outstanding one.
    pub async fn request(&self, email: &str) -> AuthResult<()> {
        let user = self.resettable_account(email).await?;
        self.send_code(user).await
    }

    /// Like [`Self::request`], but refuses while the current code is still valid.
    pub async fn resend(&self, email: &str) -> AuthResult<()> {
        let user = self.resettable_account(email).await?;

        if let Some(remaining) = user.reset_code_remaining(Utc::now()) {
            return Err(AuthError::ResetCooldown {
                remaining_secs: ceil_secs(remaining),
            });
        }

        self.send_code(user).await
    }

    pub async fn confirm(&self, input: ResetConfirmInput) -> AuthResult<()> {
        let mut missing = Vec::new();
        if input.email.trim().is_empty() {
            missing.push("email");
        }
        if input.code.trim().is_empty() {
            missing.push("code");
        }
        if input.new_password.is_empty() {
            missing.push("newPassword");
        }
        if !missing.is_empty() {
            return Err(AuthError::MissingFields(missing));
        }

        let new_password = RawPassword::new_strong(input.new_password, &self.config.password_policy)?;
        let email = Email::new(&input.email)?;
        let code = OneTimeCode::parse(&input.code)?;
        let now = Utc::now();

        // Cheap checks first, so a bad code costs no hashing.
        let current = self
            .user_repo
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        ensure_resettable(&current, &code, now)?;

        let pepper = self.config.password_pepper.clone();
        let current_hash = current.password;
        let new_hash = blocking(move || {
            if current_hash
                .as_ref()
                .is_some_and(|hash| hash.verify(&new_password, pepper.as_deref()))
            {
                return Err(AuthError::SamePassword);
            }
            UserPassword::from_raw(&new_password, pepper.as_deref())
        })
        .await?;

        // Re-checked against the locked row. Any other reset in between
        // consumed this code, so the hash compared above is still current.
        let check = |user: &User| -> AuthResult<UserPassword> {
            ensure_resettable(user, &code, now)?;
            Ok(new_hash.clone())
        };

        let user = self.user_repo.reset_password(&email, &check).await?;

        tracing::info!(user_id = %user.user_id, "Password reset");

        match self.session_repo.delete_all_for_user(&user.user_id).await {
            Ok(count) => tracing::debug!(user_id = %user.user_id, count, "Sessions invalidated"),
            Err(e) => tracing::warn!(
                user_id = %user.user_id,
                error = %e,
                "Failed to invalidate sessions after password reset"
            ),
        }

        Ok(())
    }

    async fn resettable_account(&self, email: &str) -> AuthResult<User> {
        if email.trim().is_empty() {
            return Err(AuthError::MissingFields(vec!["email"]));
        }
        let email = Email::new(email)?;

        let user = self
            .user_repo
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if user.auth_provider != AuthProvider::Email {
            return Err(AuthError::WrongAuthProvider(user.auth_provider));
        }
        Ok(user)
    }

    async fn send_code(&self, mut user: User) -> AuthResult<()> {
        let code = OneTimeCode::generate();
        user.set_reset_code(code.clone(), span(self.config.code_ttl), Utc::now());

        let mail = reset_mail(&user, &code, self.config.code_ttl);
        self.user_repo
            .store_reset_code(&user, Box::pin(self.mailer.send(mail)))
            .await?;

        tracing::info!(
            user_id = %user.user_id,
            email = %user.email.masked(),
            "Password reset code sent"
        );
        Ok(())
    }
}

fn ensure_resettable(user: &User, code: &OneTimeCode, now: DateTime<Utc>) -> AuthResult<()> {
    if user.auth_provider != AuthProvider::Email {
        return Err(AuthError::WrongAuthProvider(user.auth_provider));
    }
    user.check_reset_code(code, now)
}
