//! Auth Middleware
//!
//! Per-IP rate limits and the guard for protected routes.

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use platform::client::{client_key, extract_client_ip};
use platform::rate_limit::{RateLimitConfig, RateLimitStore, now_ms};
use std::net::{IpAddr, SocketAddr};

use crate::application::{CheckSessionUseCase, SessionManager};
use crate::domain::entity::auth_session::SessionUser;
use crate::domain::port::{IdentityProvider, Mailer};
use crate::domain::repository::AuthRepository;
use crate::error::AuthError;
use crate::presentation::cookies;
use crate::presentation::handlers::AuthAppState;

/// Rate-limit bucket for the caller of `req` within `scope`
fn limit_key(scope: &str, req: &Request<Body>, trusted_proxies: &[IpAddr]) -> String {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip());
    let client_ip = extract_client_ip(req.headers(), peer, trusted_proxies);
    format!("{scope}:{}", client_key(client_ip))
}

/// Count one request against `key`.
///
/// `Err` carries the 429 response. A failing store lets the request through.
async fn enforce<S>(store: &S, key: String, config: &RateLimitConfig) -> Result<(), Response>
where
    S: RateLimitStore + Sync,
{
    match store.check_and_increment(&key, config).await {
        Ok(result) if result.allowed => Ok(()),
        Ok(result) => {
            tracing::warn!(client = %key, "Rate limit exceeded");
            Err(AuthError::RateLimited {
                retry_after_secs: result.retry_after_secs(now_ms()),
            }
            .into_response())
        }
        Err(e) => {
            tracing::warn!(client = %key, error = %e, "Rate limit store unavailable");
            Ok(())
        }
    }
}

/// Rate limit for `POST /auth/login`
pub async fn limit_login<R, M, G>(
    State(state): State<AuthAppState<R, M, G>>,
    req: Request<Body>,
    next: Next,
) -> Response
where
    R: AuthRepository,
    M: Mailer + Send + Sync + 'static,
    G: IdentityProvider + Send + Sync + 'static,
{
    let key = limit_key("login", &req, &state.config.trusted_proxies);
    if let Err(response) = enforce(state.limits.as_ref(), key, &state.config.login_rate_limit).await
    {
        return response;
    }

    next.run(req).await
}

/// Rate limit for `GET /auth/session`. Callers with a live logged-in
/// session are never counted.
pub async fn limit_session_check<R, M, G>(
    State(state): State<AuthAppState<R, M, G>>,
    req: Request<Body>,
    next: Next,
) -> Response
where
    R: AuthRepository,
    M: Mailer + Send + Sync + 'static,
    G: IdentityProvider + Send + Sync + 'static,
{
    let sessions = SessionManager::new(state.repo.clone(), state.config.clone());
    let token = cookies::session_token(req.headers(), &state.config);
    let key = limit_key("session", &req, &state.config.trusted_proxies);

    let logged_in = match sessions.load(token.as_deref()).await {
        Ok(session) => session.is_some_and(|s| s.user().is_some()),
        Err(e) => {
            tracing::warn!(error = %e, "Session lookup failed in rate limiter");
            false
        }
    };

    if !logged_in {
        if let Err(response) =
            enforce(state.limits.as_ref(), key, &state.config.session_rate_limit).await
        {
            return response;
        }
    }

    next.run(req).await
}

/// Middleware that requires a logged-in caller (session or access token).
///
/// Inserts the caller as a [`SessionUser`] extension.
pub async fn require_auth<R, M, G>(
    State(state): State<AuthAppState<R, M, G>>,
    mut req: Request<Body>,
    next: Next,
) -> Response
where
    R: AuthRepository,
    M: Mailer + Send + Sync + 'static,
    G: IdentityProvider + Send + Sync + 'static,
{
    let use_case = CheckSessionUseCase::new(
        state.repo.clone(),
        state.repo.clone(),
        state.tokens.clone(),
        state.config.clone(),
    );

    let session = cookies::session_token(req.headers(), &state.config);
    let access = cookies::access_token(req.headers(), &state.config);

    let user = match use_case
        .authenticate(session.as_deref(), access.as_deref())
        .await
    {
        Ok(Some(user)) => user,
        Ok(None) => return AuthError::Unauthorized.into_response(),
        Err(e) => return e.into_response(),
    };

    req.extensions_mut().insert(SessionUser::from(&user));
    next.run(req).await
}
