//! Credential Issuing
//!
//! What every successful login (password, activation, Google) hands out:
//! an access token, an allow-listed refresh token and a regenerated session
//! carrying the user.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::application::config::{AuthConfig, span};
use crate::application::session::SessionManager;
use crate::domain::entity::auth_session::{AuthSession, SessionData};
use crate::domain::entity::{refresh_token::RefreshTokenRecord, user::User};
use crate::domain::port::TokenIssuer;
use crate::domain::repository::{AuthSessionRepository, RefreshTokenRepository};
use crate::error::AuthResult;

/// Tokens to hand to the client
#[derive(Debug)]
pub struct IssuedCredentials {
    pub access_token: String,
    /// Lifetime of `access_token` (cookie Max-Age)
    pub access_ttl: Duration,
    pub refresh_token: String,
    pub session_token: String,
}

pub struct CredentialIssuer<S, T>
where
    S: AuthSessionRepository,
    T: RefreshTokenRepository,
{
    sessions: SessionManager<S>,
    refresh_repo: Arc<T>,
    tokens: Arc<dyn TokenIssuer>,
}

impl<S, T> CredentialIssuer<S, T>
where
    S: AuthSessionRepository,
    T: RefreshTokenRepository,
{
    pub fn new(
        session_repo: Arc<S>,
        refresh_repo: Arc<T>,
        tokens: Arc<dyn TokenIssuer>,
        config: Arc<AuthConfig>,
    ) -> Self {
        Self {
            sessions: SessionManager::new(session_repo, config),
            refresh_repo,
            tokens,
        }
    }

    pub async fn issue(
        &self,
        user: &User,
        access_ttl: Duration,
        previous_session: Option<&AuthSession>,
    ) -> AuthResult<IssuedCredentials> {
        let access_token = self.tokens.issue_access(user, span(access_ttl))?;

        let refresh = self.tokens.issue_refresh(&user.user_id)?;
        self.refresh_repo
            .insert(&RefreshTokenRecord {
                token: refresh.token.clone(),
                user_id: user.user_id,
                expires_at: refresh.expires_at,
                created_at: Utc::now(),
            })
            .await?;

        let (_, session_token) = self
            .sessions
            .regenerate(previous_session, SessionData::for_user(user))
            .await?;

        Ok(IssuedCredentials {
            access_token,
            access_ttl,
            refresh_token: refresh.token,
            session_token,
        })
    }
}
