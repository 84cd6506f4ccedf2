//! Auth Router

use axum::{
    Router, middleware,
    routing::{get, post},
};
use platform::rate_limit::InMemoryRateLimitStore;
use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::domain::port::{IdentityProvider, Mailer, TokenIssuer};
use crate::domain::repository::AuthRepository;
use crate::infra::{GoogleIdentityProvider, MailTransport, PgAuthRepository};
use crate::presentation::handlers::{self, AuthAppState};
use crate::presentation::middleware::{limit_login, limit_session_check, require_auth};

/// Create the Auth router with the production adapters
pub fn auth_router(
    repo: PgAuthRepository,
    mailer: MailTransport,
    identity: GoogleIdentityProvider,
    tokens: Arc<dyn TokenIssuer>,
    config: AuthConfig,
    limits: Arc<InMemoryRateLimitStore>,
) -> Router {
    auth_router_generic(AuthAppState {
        repo: Arc::new(repo),
        mailer: Arc::new(mailer),
        identity: Arc::new(identity),
        tokens,
        config: Arc::new(config),
        limits,
    })
}

/// Create a generic Auth router for any set of adapters
pub fn auth_router_generic<R, M, G>(state: AuthAppState<R, M, G>) -> Router
where
    R: AuthRepository,
    M: Mailer + Send + Sync + 'static,
    G: IdentityProvider + Send + Sync + 'static,
{
    let login = Router::new()
        .route("/auth/login", post(handlers::login::<R, M, G>))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            limit_login::<R, M, G>,
        ));

    let session = Router::new()
        .route("/auth/session", get(handlers::check_session::<R, M, G>))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            limit_session_check::<R, M, G>,
        ));

    let protected = Router::new()
        .route("/auth/me", get(handlers::me))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_auth::<R, M, G>,
        ));

    Router::new()
        .route("/auth/logout", post(handlers::logout::<R, M, G>))
        .route("/auth/refresh", post(handlers::refresh::<R, M, G>))
        .route("/signup", post(handlers::sign_up::<R, M, G>))
        .route("/activate", post(handlers::activate::<R, M, G>))
        .route("/resend-code", post(handlers::resend_code::<R, M, G>))
        .route("/forgot-password", post(handlers::forgot_password::<R, M, G>))
        .route("/resend-reset-code", post(handlers::resend_reset_code::<R, M, G>))
        .route("/reset-password", post(handlers::reset_password::<R, M, G>))
        .route("/auth/google", get(handlers::google_start::<R, M, G>))
        .route("/auth/google/callback", get(handlers::google_callback::<R, M, G>))
        .merge(login)
        .merge(session)
        .merge(protected)
        .with_state(state)
}
