//! Application Configuration
//!
//! Configuration for the Auth application layer.

use std::net::IpAddr;
use std::time::Duration;

use platform::cookie::CookieConfig;
use platform::password::PasswordPolicy;
use platform::rate_limit::RateLimitConfig;

/// Re-export SameSite from platform
pub use platform::cookie::SameSite;

/// Auth application configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Session cookie name
    pub session_cookie_name: String,
    /// Access token cookie name
    pub access_cookie_name: String,
    /// Refresh token cookie name
    pub refresh_cookie_name: String,
    /// Session secret key for HMAC signing (32 bytes)
    pub session_secret: [u8; 32],
    /// Server session lifetime, extended on activity
    pub session_ttl: Duration,
    /// Access token lifetime (email login)
    pub access_ttl: Duration,
    /// Access token lifetime (Google login)
    pub oauth_access_ttl: Duration,
    /// Refresh token lifetime
    pub refresh_ttl: Duration,
    /// Activation and reset code lifetime
    pub code_ttl: Duration,
    /// Failed logins that lock the account
    pub max_login_attempts: i32,
    /// How long failures count toward a lockout
    pub lockout_window: Duration,
    /// Per-IP limit on `POST /auth/login`
    pub login_rate_limit: RateLimitConfig,
    /// Per-IP limit on anonymous `GET /auth/session`
    pub session_rate_limit: RateLimitConfig,
    /// Peers whose `X-Forwarded-For` / `X-Real-IP` headers are believed
    pub trusted_proxies: Vec<IpAddr>,
    /// Whether to require Secure cookie
    pub cookie_secure: bool,
    /// SameSite policy
    pub cookie_same_site: SameSite,
    /// Cookie `Domain` attribute
    pub cookie_domain: Option<String>,
    /// Frontend base URL for redirects and mail links
    pub frontend_url: String,
    /// Sender address for outgoing mail
    pub mail_from: String,
    /// Password pepper (optional, application-wide secret)
    pub password_pepper: Option<Vec<u8>>,
    /// Strength rules for new passwords
    pub password_policy: PasswordPolicy,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_cookie_name: "sid".to_string(),
            access_cookie_name: "auth_token".to_string(),
            refresh_cookie_name: "refresh_token".to_string(),
            session_secret: [0u8; 32],
            session_ttl: Duration::from_secs(24 * 3600), // 24 hours
            access_ttl: Duration::from_secs(15 * 60),    // 15 minutes
            oauth_access_ttl: Duration::from_secs(3600), // 1 hour
            refresh_ttl: Duration::from_secs(7 * 24 * 3600), // 1 week
            code_ttl: Duration::from_secs(15 * 60),
            max_login_attempts: 5,
            lockout_window: Duration::from_secs(15 * 60),
            login_rate_limit: RateLimitConfig::new(10, 15 * 60),
            session_rate_limit: RateLimitConfig::new(100, 60),
            trusted_proxies: Vec::new(),
            cookie_secure: true,
            cookie_same_site: SameSite::None,
            cookie_domain: None,
            frontend_url: "http://localhost:40922".to_string(),
            mail_from: "Geoconsult <no-reply@localhost>".to_string(),
            password_pepper: None,
            password_policy: PasswordPolicy::default(),
        }
    }
}

impl AuthConfig {
    /// Create config with a random session secret (for development)
    pub fn with_random_secret() -> Self {
        let mut secret = [0u8; 32];
        secret.copy_from_slice(&platform::crypto::random_bytes(32));
        Self {
            session_secret: secret,
            ..Default::default()
        }
    }

    /// Create config for development (insecure cookie)
    pub fn development() -> Self {
        Self {
            cookie_secure: false,
            cookie_same_site: SameSite::Lax,
            ..Self::with_random_secret()
        }
    }

    /// Cookie attributes shared by set and clear for `name`
    pub fn cookie(&self, name: &str, max_age: Duration) -> CookieConfig {
        CookieConfig {
            name: name.to_string(),
            secure: self.cookie_secure,
            http_only: true,
            same_site: self.cookie_same_site,
            path: "/".to_string(),
            domain: self.cookie_domain.clone(),
            max_age_secs: Some(max_age.as_secs() as i64),
        }
    }

    pub fn session_cookie(&self) -> CookieConfig {
        self.cookie(&self.session_cookie_name, self.session_ttl)
    }

    pub fn access_cookie(&self, ttl: Duration) -> CookieConfig {
        self.cookie(&self.access_cookie_name, ttl)
    }

    pub fn refresh_cookie(&self) -> CookieConfig {
        self.cookie(&self.refresh_cookie_name, self.refresh_ttl)
    }

    /// Get password pepper as slice
    pub fn pepper(&self) -> Option<&[u8]> {
        self.password_pepper.as_deref()
    }

    /// Frontend URL without a trailing slash
    pub fn frontend_base(&self) -> &str {
        self.frontend_url.trim_end_matches('/')
    }
}

/// Convert a configured duration for timestamp arithmetic.
pub(crate) fn span(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX)
}

/// Whole seconds, rounded up, for `retryAfterSeconds`-style fields.
pub(crate) fn ceil_secs(remaining: chrono::Duration) -> u64 {
    let millis = remaining.num_milliseconds().max(0) as u64;
    millis.div_ceil(1000).max(1)
}
