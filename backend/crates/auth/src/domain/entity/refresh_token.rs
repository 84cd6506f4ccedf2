//! Refresh Token Record
//!
//! Server-side allow-list entry for an issued refresh token. A token whose
//! row is gone is rejected even when its signature is valid.

use chrono::{DateTime, Utc};

use crate::domain::value_object::user_id::UserId;

#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    /// The encoded token itself (primary key)
    pub token: String,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
