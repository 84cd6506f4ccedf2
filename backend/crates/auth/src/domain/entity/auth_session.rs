//! Auth Session Entity
//!
//! Represents a server-side session.
//! Stored in database with cookie-based token reference.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entity::user::User;
use crate::domain::value_object::{auth_provider::AuthProvider, user_id::UserId};

/// Denormalized account snapshot kept in the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub auth_provider: AuthProvider,
    pub is_active: bool,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.user_id,
            email: user.email.as_str().to_string(),
            first_name: user.first_name.as_str().to_string(),
            last_name: user.last_name.as_str().to_string(),
            auth_provider: user.auth_provider,
            is_active: user.is_active,
        }
    }
}

/// Pending Google round trip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthHandshake {
    /// `true` when the user started from the signup page
    pub signup: bool,
    /// Anti-forgery value echoed back by the provider
    pub state: String,
}

/// JSON payload of a session row
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth: Option<OAuthHandshake>,
}

impl SessionData {
    pub fn for_user(user: &User) -> Self {
        Self {
            user: Some(SessionUser::from(user)),
            oauth: None,
        }
    }
}

/// Auth session entity
#[derive(Debug, Clone)]
pub struct AuthSession {
    /// Session ID (UUID v4)
    pub session_id: Uuid,
    /// Owning account, once logged in
    pub user_id: Option<UserId>,
    pub data: SessionData,
    /// Session expiration (Unix timestamp ms)
    pub expires_at_ms: i64,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Last activity timestamp
    pub last_activity_at: DateTime<Utc>,
}

impl AuthSession {
    /// Create a new session
    ///
    /// TTL is provided by the application layer (config), not hard-coded here.
    pub fn new(data: SessionData, ttl: Duration, now: DateTime<Utc>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            user_id: data.user.as_ref().map(|u| u.id),
            data,
            expires_at_ms: (now + ttl).timestamp_millis(),
            created_at: now,
            last_activity_at: now,
        }
    }

    /// Check if session has expired
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.timestamp_millis() >= self.expires_at_ms
    }

    /// Sliding expiry: record activity and push expiry to `now + ttl`.
    pub fn touch(&mut self, ttl: Duration, now: DateTime<Utc>) {
        self.last_activity_at = now;
        self.expires_at_ms = (now + ttl).timestamp_millis();
    }

    pub fn user(&self) -> Option<&SessionUser> {
        self.data.user.as_ref()
    }

    /// Remove and return the pending OAuth handshake (one-shot).
    pub fn take_handshake(&mut self) -> Option<OAuthHandshake> {
        self.data.oauth.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_and_touch() {
        let now = Utc::now();
        let mut session = AuthSession::new(SessionData::default(), Duration::minutes(10), now);

        assert!(!session.is_expired(now));
        assert!(session.is_expired(now + Duration::minutes(10)));

        session.touch(Duration::minutes(10), now + Duration::minutes(9));
        assert!(!session.is_expired(now + Duration::minutes(10)));
    }

    #[test]
    fn test_data_json_shape() {
        let data = SessionData {
            user: None,
            oauth: Some(OAuthHandshake {
                signup: true,
                state: "abc".into(),
            }),
        };
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json, serde_json::json!({"oauth": {"signup": true, "state": "abc"}}));

        let back: SessionData = serde_json::from_value(json).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn test_take_handshake_is_one_shot() {
        let mut session = AuthSession::new(
            SessionData {
                user: None,
                oauth: Some(OAuthHandshake {
                    signup: false,
                    state: "s".into(),
                }),
            },
            Duration::minutes(1),
            Utc::now(),
        );
        assert!(session.take_handshake().is_some());
        assert!(session.take_handshake().is_none());
    }
}
