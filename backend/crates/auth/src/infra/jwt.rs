//! JWT Token Issuer (HS256)
//!
//! Access and refresh tokens are signed with different secrets, so one can
//! never be replayed as the other.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use crate::domain::entity::user::User;
use crate::domain::port::{AccessClaims, IssuedRefreshToken, RefreshClaims, TokenIssuer};
use crate::domain::value_object::user_id::UserId;
use crate::error::{AuthError, AuthResult};

pub struct JwtTokenIssuer {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    refresh_ttl: Duration,
}

impl JwtTokenIssuer {
    pub fn new(access_secret: &[u8], refresh_secret: &[u8], refresh_ttl: Duration) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(access_secret),
            access_decoding: DecodingKey::from_secret(access_secret),
            refresh_encoding: EncodingKey::from_secret(refresh_secret),
            refresh_decoding: DecodingKey::from_secret(refresh_secret),
            refresh_ttl,
        }
    }

    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation
    }
}

impl TokenIssuer for JwtTokenIssuer {
    fn issue_access(&self, user: &User, ttl: Duration) -> AuthResult<String> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: user.user_id.to_string(),
            email: user.email.as_str().to_string(),
            first_name: user.first_name.as_str().to_string(),
            last_name: user.last_name.as_str().to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.access_encoding)
            .map_err(|e| AuthError::Internal(format!("Failed to sign access token: {}", e)))
    }

    fn verify_access(&self, token: &str) -> AuthResult<AccessClaims> {
        decode::<AccessClaims>(token, &self.access_decoding, &Self::validation())
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Access token rejected");
                AuthError::Unauthorized
            })
    }

    fn issue_refresh(&self, user_id: &UserId) -> AuthResult<IssuedRefreshToken> {
        let now = Utc::now();
        let expires_at = now + self.refresh_ttl;
        let claims = RefreshClaims {
            sub: user_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.refresh_encoding)
            .map_err(|e| AuthError::Internal(format!("Failed to sign refresh token: {}", e)))?;

        Ok(IssuedRefreshToken { token, expires_at })
    }

    fn verify_refresh(&self, token: &str) -> AuthResult<RefreshClaims> {
        decode::<RefreshClaims>(token, &self.refresh_decoding, &Self::validation())
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Refresh token rejected");
                AuthError::SessionExpired
            })
    }
}
