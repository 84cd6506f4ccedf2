//! Session Manager
//!
//! The only place session tokens are signed and parsed. A token is
//! `<session uuid>.<base64url(HMAC-SHA256(uuid))>`.

use std::sync::Arc;

use chrono::Utc;
use platform::crypto::{constant_time_eq, from_base64_url, hmac_sha256, to_base64_url};
use uuid::Uuid;

use crate::application::config::{AuthConfig, span};
use crate::domain::entity::auth_session::{AuthSession, SessionData};
use crate::domain::repository::AuthSessionRepository;
use crate::error::{AuthError, AuthResult};

pub struct SessionManager<S>
where
    S: AuthSessionRepository,
{
    repo: Arc<S>,
    config: Arc<AuthConfig>,
}

impl<S> SessionManager<S>
where
    S: AuthSessionRepository,
{
    pub fn new(repo: Arc<S>, config: Arc<AuthConfig>) -> Self {
        Self { repo, config }
    }

    /// Generate signed session token
    pub fn sign(&self, session_id: Uuid) -> AuthResult<String> {
        let session_id = session_id.to_string();
        let signature = hmac_sha256(&self.config.session_secret, session_id.as_bytes())
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        Ok(format!("{}.{}", session_id, to_base64_url(&signature)))
    }

    /// Parse and verify session token
    pub fn parse_token(&self, token: &str) -> Option<Uuid> {
        let (session_id, signature_b64) = token.split_once('.')?;

        let signature = from_base64_url(signature_b64).ok()?;
        let expected = hmac_sha256(&self.config.session_secret, session_id.as_bytes()).ok()?;
        if !constant_time_eq(&signature, &expected) {
            return None;
        }

        session_id.parse().ok()
    }

    /// Load the live session behind a cookie value.
    ///
    /// Expired rows are deleted on sight.
    pub async fn load(&self, token: Option<&str>) -> AuthResult<Option<AuthSession>> {
        let Some(session_id) = token.and_then(|t| self.parse_token(t)) else {
            return Ok(None);
        };

        let Some(session) = self.repo.find_by_id(session_id).await? else {
            return Ok(None);
        };

        if session.is_expired(Utc::now()) {
            self.repo.delete(session_id).await?;
            return Ok(None);
        }

        Ok(Some(session))
    }

    /// Replace `previous` (if any) with a fresh session id carrying `data`.
    pub async fn regenerate(
        &self,
        previous: Option<&AuthSession>,
        data: SessionData,
    ) -> AuthResult<(AuthSession, String)> {
        if let Some(previous) = previous {
            self.repo.delete(previous.session_id).await?;
        }

        let session = AuthSession::new(data, span(self.config.session_ttl), Utc::now());
        self.repo.create(&session).await?;
        let token = self.sign(session.session_id)?;

        tracing::debug!(session_id = %session.session_id, "Session regenerated");
        Ok((session, token))
    }

    /// Persist data changes
    pub async fn save(&self, session: &AuthSession) -> AuthResult<()> {
        self.repo.update(session).await
    }

    /// Extend expiry after activity
    pub async fn touch(&self, session: &mut AuthSession) -> AuthResult<()> {
        session.touch(span(self.config.session_ttl), Utc::now());
        self.repo.update(session).await
    }

    pub async fn destroy(&self, session_id: Uuid) -> AuthResult<()> {
        self.repo.delete(session_id).await
    }
}
