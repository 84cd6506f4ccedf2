//! Sign Out Use Case
//!
//! Invalidates the server session and the presented refresh token.
//! Never fails: logging out twice, or without any credentials, is fine.

use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::application::session::SessionManager;
use crate::domain::repository::{AuthSessionRepository, RefreshTokenRepository};

/// Sign out use case
pub struct SignOutUseCase<S, T>
where
    S: AuthSessionRepository,
    T: RefreshTokenRepository,
{
    sessions: SessionManager<S>,
    refresh_repo: Arc<T>,
}

impl<S, T> SignOutUseCase<S, T>
where
    S: AuthSessionRepository,
    T: RefreshTokenRepository,
{
    pub fn new(session_repo: Arc<S>, refresh_repo: Arc<T>, config: Arc<AuthConfig>) -> Self {
        Self {
            sessions: SessionManager::new(session_repo, config),
            refresh_repo,
        }
    }

    /// Sign out from current session
    pub async fn execute(&self, session_token: Option<&str>, refresh_token: Option<&str>) {
        if let Some(session_id) = session_token.and_then(|t| self.sessions.parse_token(t)) {
            match self.sessions.destroy(session_id).await {
                Ok(()) => tracing::info!(session_id = %session_id, "User signed out"),
                Err(e) => tracing::warn!(error = %e, "Failed to destroy session on logout"),
            }
        }

        if let Some(token) = refresh_token {
            if let Err(e) = self.refresh_repo.revoke(token).await {
                tracing::warn!(error = %e, "Failed to revoke refresh token on logout");
            }
        }
    }
}
