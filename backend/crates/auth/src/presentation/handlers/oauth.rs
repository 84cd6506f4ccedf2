//! Google sign-in redirect handlers
//!
//! Both endpoints answer with redirects only; failures become
//! `?error=<reason>` on the frontend login or signup page.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};

use crate::application::{CallbackParams, OAuthUseCase};
use crate::domain::port::{IdentityProvider, Mailer};
use crate::domain::repository::AuthRepository;
use crate::error::AuthResult;
use crate::presentation::cookies;
use crate::presentation::dto::{GoogleCallbackQuery, GoogleStartQuery};
use crate::presentation::handlers::AuthAppState;

fn use_case<R, M, G>(state: &AuthAppState<R, M, G>) -> OAuthUseCase<R, R, R, G>
where
    R: AuthRepository,
    M: Mailer + Send + Sync + 'static,
    G: IdentityProvider + Send + Sync + 'static,
{
    OAuthUseCase::new(
        state.repo.clone(),
        state.repo.clone(),
        state.repo.clone(),
        state.identity.clone(),
        state.tokens.clone(),
        state.config.clone(),
    )
}

/// GET /auth/google?intent=signup|login
pub async fn google_start<R, M, G>(
    State(state): State<AuthAppState<R, M, G>>,
    headers: HeaderMap,
    Query(query): Query<GoogleStartQuery>,
) -> AuthResult<impl IntoResponse>
where
    R: AuthRepository,
    M: Mailer + Send + Sync + 'static,
    G: IdentityProvider + Send + Sync + 'static,
{
    let current = cookies::session_token(&headers, &state.config);
    let start = use_case(&state)
        .begin(query.is_signup(), current.as_deref())
        .await?;

    Ok((
        cookies::session_cookie(&state.config, &start.session_token),
        Redirect::to(&start.authorize_url),
    ))
}

/// GET /auth/google/callback
pub async fn google_callback<R, M, G>(
    State(state): State<AuthAppState<R, M, G>>,
    headers: HeaderMap,
    Query(query): Query<GoogleCallbackQuery>,
) -> Response
where
    R: AuthRepository,
    M: Mailer + Send + Sync + 'static,
    G: IdentityProvider + Send + Sync + 'static,
{
    let current = cookies::session_token(&headers, &state.config);
    let params = CallbackParams {
        code: query.code,
        state: query.state,
        error: query.error,
    };

    let frontend = state.config.frontend_base();
    match use_case(&state).complete(params, current.as_deref()).await {
        Ok(credentials) => (
            cookies::login_cookies(&state.config, &credentials),
            Redirect::to(&format!("{}/auth/success", frontend)),
        )
            .into_response(),
        Err(failure) => Redirect::to(&failure.redirect_url(frontend)).into_response(),
    }
}
