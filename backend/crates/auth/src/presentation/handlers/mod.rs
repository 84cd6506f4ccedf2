//! HTTP Handlers

pub mod oauth;
pub mod password;
pub mod session;
pub mod signup;

use std::sync::Arc;

use platform::rate_limit::InMemoryRateLimitStore;

use crate::application::config::AuthConfig;
use crate::domain::port::{IdentityProvider, Mailer, TokenIssuer};
use crate::domain::repository::AuthRepository;

pub use oauth::{google_callback, google_start};
pub use password::{forgot_password, resend_reset_code, reset_password};
pub use session::{check_session, login, logout, me, refresh};
pub use signup::{activate, resend_code, sign_up};

/// Shared state for auth handlers
pub struct AuthAppState<R, M, G>
where
    R: AuthRepository,
    M: Mailer + Send + Sync + 'static,
    G: IdentityProvider + Send + Sync + 'static,
{
    pub repo: Arc<R>,
    pub mailer: Arc<M>,
    pub identity: Arc<G>,
    pub tokens: Arc<dyn TokenIssuer>,
    pub config: Arc<AuthConfig>,
    pub limits: Arc<InMemoryRateLimitStore>,
}

// Manual impl: the generics themselves need not be `Clone`.
impl<R, M, G> Clone for AuthAppState<R, M, G>
where
    R: AuthRepository,
    M: Mailer + Send + Sync + 'static,
    G: IdentityProvider + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            mailer: self.mailer.clone(),
            identity: self.identity.clone(),
            tokens: self.tokens.clone(),
            config: self.config.clone(),
            limits: self.limits.clone(),
        }
    }
}
