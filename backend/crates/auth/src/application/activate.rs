//! Activation Use Cases
//!
//! Consuming an activation code (which logs the user in) and re-sending one.

use std::sync::Arc;

use chrono::Utc;

use crate::application::config::{AuthConfig, span};
use crate::application::credentials::CredentialIssuer;
use crate::application::mail::activation_mail;
use crate::application::session::SessionManager;
use crate::application::sign_in::SignInOutput;
use crate::domain::port::{Mailer, TokenIssuer};
use crate::domain::repository::{AuthSessionRepository, RefreshTokenRepository, UserRepository};
use crate::domain::value_object::{
    auth_provider::AuthProvider, email::Email, one_time_code::OneTimeCode,
};
use crate::error::{AuthError, AuthResult};

pub struct ActivateUseCase<U, S, T>
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

impl<U, S, T> ActivateUseCase<U, S, T>
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

    pub async fn execute(
        &self,
        email: &str,
        code: &str,
        current_session: Option<&str>,
    ) -> AuthResult<SignInOutput> {
        let mut missing = Vec::new();
        if email.trim().is_empty() {
            missing.push("email");
        }
        if code.trim().is_empty() {
            missing.push("code");
        }
        if !missing.is_empty() {
            return Err(AuthError::MissingFields(missing));
        }

        let email = Email::new(email)?;
        let code = OneTimeCode::parse(code)?;
        let now = Utc::now();

        let Some(user) = self.user_repo.activate(&email, &code, now).await? else {
            // Nothing matched: work out why from the current row.
            let user = self
                .user_repo
                .find_by_email(&email)
                .await?
                .ok_or(AuthError::UserNotFound)?;
            return Err(user.activation_failure(&code, now));
        };

        tracing::info!(user_id = %user.user_id, email = %email.masked(), "Account activated");

        let previous = self.sessions.load(current_session).await?;
        let credentials = self
            .issuer
            .issue(&user, self.config.access_ttl, previous.as_ref())
            .await?;

        Ok(SignInOutput { user, credentials })
    }
}

pub struct ResendActivationUseCase<U, M>
where
    U: UserRepository,
    M: Mailer,
{
    user_repo: Arc<U>,
    mailer: Arc<M>,
    config: Arc<AuthConfig>,
}

impl<U, M> ResendActivationUseCase<U, M>
where
    U: UserRepository,
    M: Mailer,
{
    pub fn new(user_repo: Arc<U>, mailer: Arc<M>, config: Arc<AuthConfig>) -> Self {
        Self {
            user_repo,
            mailer,
            config,
        }
    }

    /// Replace the activation code and mail it. A failed send keeps the
    /// previous code.
    pub async fn execute(&self, email: &str) -> AuthResult<()> {
        if email.trim().is_empty() {
            return Err(AuthError::MissingFields(vec!["email"]));
        }
        let email = Email::new(email)?;

        let mut user = self
            .user_repo
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if user.is_active {
            return Err(AuthError::AlreadyActive);
        }
        user.ensure_provider(AuthProvider::Email)?;

        let code = OneTimeCode::generate();
        user.set_activation_code(code.clone(), span(self.config.code_ttl), Utc::now());

        let mail = activation_mail(&user, &code, self.config.code_ttl);
        self.user_repo
            .store_activation_code(&user, Box::pin(self.mailer.send(mail)))
            .await?;

        tracing::info!(user_id = %user.user_id, "Activation code re-sent");
        Ok(())
    }
}
