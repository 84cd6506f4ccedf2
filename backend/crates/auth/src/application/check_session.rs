//! Check Session Use Case
//!
//! Resolves who is calling: first from the server session, then from an
//! access token (which re-establishes a session).

use std::sync::Arc;

use uuid::Uuid;

use crate::application::config::AuthConfig;
use crate::application::session::SessionManager;
use crate::domain::entity::auth_session::{AuthSession, SessionData};
use crate::domain::entity::user::User;
use crate::domain::port::TokenIssuer;
use crate::domain::repository::{AuthSessionRepository, UserRepository};
use crate::domain::value_object::user_id::UserId;
use crate::error::AuthResult;

/// Session check result
#[derive(Debug)]
pub enum SessionCheck {
    Authenticated {
        user: User,
        /// Cookie value to (re)set
        session_token: String,
    },
    Anonymous,
}

/// Check session use case
pub struct CheckSessionUseCase<U, S>
where
    U: UserRepository,
    S: AuthSessionRepository,
{
    user_repo: Arc<U>,
    sessions: SessionManager<S>,
    tokens: Arc<dyn TokenIssuer>,
}

impl<U, S> CheckSessionUseCase<U, S>
where
    U: UserRepository,
    S: AuthSessionRepository,
{
    pub fn new(
        user_repo: Arc<U>,
        session_repo: Arc<S>,
        tokens: Arc<dyn TokenIssuer>,
        config: Arc<AuthConfig>,
    ) -> Self {
        Self {
            user_repo,
            sessions: SessionManager::new(session_repo, config),
            tokens,
        }
    }

    /// Never errors for "not logged in"; only storage failures propagate.
    pub async fn execute(
        &self,
        session_token: Option<&str>,
        access_token: Option<&str>,
    ) -> AuthResult<SessionCheck> {
        let (session_user, leftover) = self.resolve_session(session_token).await?;

        if let Some((user, mut session)) = session_user {
            self.sessions.touch(&mut session).await?;
            let session_token = self.sessions.sign(session.session_id)?;
            return Ok(SessionCheck::Authenticated {
                user,
                session_token,
            });
        }

        if let Some(user) = self.resolve_access_token(access_token).await? {
            let (_, session_token) = self
                .sessions
                .regenerate(leftover.as_ref(), SessionData::for_user(&user))
                .await?;

            tracing::debug!(user_id = %user.user_id, "Session re-established from access token");
            return Ok(SessionCheck::Authenticated {
                user,
                session_token,
            });
        }

        Ok(SessionCheck::Anonymous)
    }

    /// Resolve the caller without creating or extending anything.
    pub async fn authenticate(
        &self,
        session_token: Option<&str>,
        access_token: Option<&str>,
    ) -> AuthResult<Option<User>> {
        if let (Some((user, _)), _) = self.resolve_session(session_token).await? {
            return Ok(Some(user));
        }
        self.resolve_access_token(access_token).await
    }

    /// The session's user, if the session is live and its provider tag still
    /// matches the account. Also returns a live session without a valid user
    /// so it can be replaced.
    async fn resolve_session(
        &self,
        session_token: Option<&str>,
    ) -> AuthResult<(Option<(User, AuthSession)>, Option<AuthSession>)> {
        let Some(session) = self.sessions.load(session_token).await? else {
            return Ok((None, None));
        };

        let Some(session_user) = session.user().cloned() else {
            return Ok((None, Some(session)));
        };

        match self.user_repo.find_by_id(&session_user.id).await? {
            Some(user) if user.auth_provider == session_user.auth_provider => {
                Ok((Some((user, session)), None))
            }
            _ => {
                tracing::warn!(
                    session_id = %session.session_id,
                    "Stale session destroyed (account gone or provider changed)"
                );
                self.sessions.destroy(session.session_id).await?;
                Ok((None, None))
            }
        }
    }

    async fn resolve_access_token(&self, access_token: Option<&str>) -> AuthResult<Option<User>> {
        let Some(claims) = access_token.and_then(|t| self.tokens.verify_access(t).ok()) else {
            return Ok(None);
        };
        let Ok(user_id) = claims.sub.parse::<Uuid>() else {
            return Ok(None);
        };

        self.user_repo.find_by_id(&UserId::from_uuid(user_id)).await
    }
}
