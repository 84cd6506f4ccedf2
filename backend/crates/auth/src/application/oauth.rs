//! Google Sign-In Use Case
//!
//! Two halves of the redirect round trip. `begin` stores the intent and an
//! anti-forgery state in a fresh session; `complete` checks them, asks the
//! identity provider who the user is and applies [`reconcile`].

use std::sync::Arc;

use chrono::Utc;
use platform::crypto::{constant_time_eq, random_token};

use crate::application::config::AuthConfig;
use crate::application::credentials::{CredentialIssuer, IssuedCredentials};
use crate::application::session::SessionManager;
use crate::domain::entity::auth_session::{OAuthHandshake, SessionData};
use crate::domain::oauth::{ReconcileError, Reconciled, reconcile};
use crate::domain::port::{IdentityProvider, TokenIssuer};
use crate::domain::repository::{AuthSessionRepository, RefreshTokenRepository, UserRepository};
use crate::error::AuthResult;

const STATE_BYTES: usize = 32;

/// Where to send the browser to start the handshake
#[derive(Debug)]
pub struct OAuthStart {
    pub authorize_url: String,
    pub session_token: String,
}

/// Query parameters of the provider callback
#[derive(Debug, Default)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthFailureReason {
    InvalidState,
    ProviderFailed,
    Reconcile(ReconcileError),
    ServerError,
}

impl OAuthFailureReason {
    pub fn code(&self) -> &'static str {
        match self {
            OAuthFailureReason::InvalidState => "invalid_state",
            OAuthFailureReason::ProviderFailed => "oauth_failed",
            OAuthFailureReason::Reconcile(e) => e.reason_code(),
            OAuthFailureReason::ServerError => "server_error",
        }
    }
}

/// A refused callback, rendered only as a frontend redirect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OAuthFailure {
    pub reason: OAuthFailureReason,
    /// Intent recovered from the session; `false` when it was missing
    pub signup: bool,
}

impl OAuthFailure {
    pub fn redirect_url(&self, frontend_base: &str) -> String {
        let page = if self.signup { "signup" } else { "login" };
        let mut url = format!("{}/{}?error={}", frontend_base, page, self.reason.code());
        if self.reason == OAuthFailureReason::Reconcile(ReconcileError::ExistingAccountDiffProvider)
        {
            url.push_str("&provider=email");
        }
        url
    }
}

pub struct OAuthUseCase<U, S, T, G>
where
    U: UserRepository,
    S: AuthSessionRepository,
    T: RefreshTokenRepository,
    G: IdentityProvider,
{
    user_repo: Arc<U>,
    sessions: SessionManager<S>,
    issuer: CredentialIssuer<S, T>,
    identity: Arc<G>,
    config: Arc<AuthConfig>,
}

impl<U, S, T, G> OAuthUseCase<U, S, T, G>
where
    U: UserRepository,
    S: AuthSessionRepository,
    T: RefreshTokenRepository,
    G: IdentityProvider,
{
    pub fn new(
        user_repo: Arc<U>,
        session_repo: Arc<S>,
        refresh_repo: Arc<T>,
        identity: Arc<G>,
        tokens: Arc<dyn TokenIssuer>,
        config: Arc<AuthConfig>,
    ) -> Self {
        Self {
            user_repo,
            sessions: SessionManager::new(session_repo.clone(), config.clone()),
            issuer: CredentialIssuer::new(session_repo, refresh_repo, tokens, config.clone()),
            identity,
            config,
        }
    }

    /// Regenerate the session, then record the intent and state in it.
    pub async fn begin(&self, signup: bool, current_session: Option<&str>) -> AuthResult<OAuthStart> {
        let previous = self.sessions.load(current_session).await?;
        let state = random_token(STATE_BYTES);

        let (_, session_token) = self
            .sessions
            .regenerate(
                previous.as_ref(),
                SessionData {
                    user: None,
                    oauth: Some(OAuthHandshake {
                        signup,
                        state: state.clone(),
                    }),
                },
            )
            .await?;

        let authorize_url = self.identity.authorize_url(&state)?;

        tracing::debug!(signup, "Google handshake started");
        Ok(OAuthStart {
            authorize_url,
            session_token,
        })
    }

    pub async fn complete(
        &self,
        params: CallbackParams,
        current_session: Option<&str>,
    ) -> Result<IssuedCredentials, OAuthFailure> {
        let server_error = |signup: bool| OAuthFailure {
            reason: OAuthFailureReason::ServerError,
            signup,
        };

        let session = self.sessions.load(current_session).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to load session for OAuth callback");
            server_error(false)
        })?;

        let Some(mut session) = session else {
            tracing::warn!("OAuth callback without a session");
            return Err(OAuthFailure {
                reason: OAuthFailureReason::InvalidState,
                signup: false,
            });
        };

        // One-shot: the handshake is gone whatever happens next.
        let handshake = session.take_handshake();
        if handshake.is_some() {
            self.sessions.save(&session).await.map_err(|e| {
                tracing::error!(error = %e, "Failed to consume OAuth handshake");
                server_error(false)
            })?;
        }

        let Some(handshake) = handshake else {
            tracing::warn!(session_id = %session.session_id, "OAuth callback without a handshake");
            return Err(OAuthFailure {
                reason: OAuthFailureReason::InvalidState,
                signup: false,
            });
        };
        let signup = handshake.signup;
        let fail = |reason| OAuthFailure { reason, signup };

        let state_ok = params
            .state
            .as_deref()
            .is_some_and(|s| constant_time_eq(s.as_bytes(), handshake.state.as_bytes()));
        if !state_ok {
            tracing::warn!(session_id = %session.session_id, "OAuth state mismatch");
            return Err(fail(OAuthFailureReason::InvalidState));
        }

        if let Some(error) = params.error.as_deref() {
            tracing::info!(error, "Identity provider reported an error");
            return Err(fail(OAuthFailureReason::ProviderFailed));
        }
        let Some(code) = params.code.as_deref().filter(|c| !c.is_empty()) else {
            return Err(fail(OAuthFailureReason::ProviderFailed));
        };

        let identity = self.identity.exchange_code(code).await.map_err(|e| {
            tracing::warn!(error = %e, "Authorization code exchange failed");
            fail(OAuthFailureReason::ProviderFailed)
        })?;

        let existing = self
            .user_repo
            .find_by_email(&identity.email)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Account lookup failed during OAuth callback");
                server_error(signup)
            })?;

        let now = Utc::now();
        let outcome = reconcile(existing.as_ref(), &identity, signup, now).map_err(|e| {
            tracing::info!(
                email = %identity.email.masked(),
                reason = e.reason_code(),
                "Google sign-in refused"
            );
            fail(OAuthFailureReason::Reconcile(e))
        })?;

        let persisted = match &outcome {
            Reconciled::Created(user) => self.user_repo.create(user).await,
            Reconciled::LoggedIn(user) => self.user_repo.link_google(user).await,
        };
        persisted.map_err(|e| {
            tracing::error!(error = %e, "Failed to persist Google account");
            server_error(signup)
        })?;

        let user = outcome.user();
        let credentials = self
            .issuer
            .issue(user, self.config.oauth_access_ttl, Some(&session))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to issue credentials after Google sign-in");
                server_error(signup)
            })?;

        tracing::info!(
            user_id = %user.user_id,
            created = matches!(outcome, Reconciled::Created(_)),
            "User signed in with Google"
        );
        Ok(credentials)
    }
}
