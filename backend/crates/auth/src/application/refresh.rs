//! Refresh Use Case
//!
//! Trades a refresh token for a new access token and a rotated refresh
//! token. The presented token stops working the moment this succeeds.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use crate::application::config::{AuthConfig, span};
use crate::domain::entity::refresh_token::RefreshTokenRecord;
use crate::domain::port::TokenIssuer;
use crate::domain::repository::{RefreshTokenRepository, UserRepository};
use crate::domain::value_object::user_id::UserId;
use crate::error::{AuthError, AuthResult};

#[derive(Debug)]
pub struct RefreshOutput {
    pub access_token: String,
    pub access_ttl: Duration,
    pub refresh_token: String,
}

pub struct RefreshUseCase<U, T>
where
    U: UserRepository,
    T: RefreshTokenRepository,
{
    user_repo: Arc<U>,
    refresh_repo: Arc<T>,
    tokens: Arc<dyn TokenIssuer>,
    config: Arc<AuthConfig>,
}

impl<U, T> RefreshUseCase<U, T>
where
    U: UserRepository,
    T: RefreshTokenRepository,
{
    pub fn new(
        user_repo: Arc<U>,
        refresh_repo: Arc<T>,
        tokens: Arc<dyn TokenIssuer>,
        config: Arc<AuthConfig>,
    ) -> Self {
        Self {
            user_repo,
            refresh_repo,
            tokens,
            config,
        }
    }

    /// Any reason the token cannot be honored is `SessionExpired`.
    pub async fn execute(&self, refresh_token: Option<&str>) -> AuthResult<RefreshOutput> {
        let token = refresh_token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::SessionExpired)?;

        let claims = self
            .tokens
            .verify_refresh(token)
            .map_err(|_| AuthError::SessionExpired)?;
        let user_id = claims
            .sub
            .parse::<Uuid>()
            .map(UserId::from_uuid)
            .map_err(|_| AuthError::SessionExpired)?;

        let user = self
            .user_repo
            .find_by_id(&user_id)
            .await?
            .ok_or(AuthError::SessionExpired)?;

        let access_ttl = self.config.access_ttl;
        let access_token = self.tokens.issue_access(&user, span(access_ttl))?;
        let next = self.tokens.issue_refresh(&user.user_id)?;

        let now = Utc::now();
        let rotated = self
            .refresh_repo
            .rotate(
                token,
                &RefreshTokenRecord {
                    token: next.token.clone(),
                    user_id: user.user_id,
                    expires_at: next.expires_at,
                    created_at: now,
                },
                now,
            )
            .await?;

        if !rotated {
            tracing::warn!(user_id = %user.user_id, "Refresh token not on allow-list");
            return Err(AuthError::SessionExpired);
        }

        tracing::debug!(user_id = %user.user_id, "Refresh token rotated");
        Ok(RefreshOutput {
            access_token,
            access_ttl,
            refresh_token: next.token,
        })
    }
}
