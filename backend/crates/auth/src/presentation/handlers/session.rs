//! Login, logout, refresh and session handlers

use axum::Json;
use axum::extract::{Extension, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::application::{
    CheckSessionUseCase, RefreshUseCase, SessionCheck, SignInInput, SignInUseCase, SignOutUseCase,
};
use crate::domain::entity::auth_session::SessionUser;
use crate::domain::port::{IdentityProvider, Mailer};
use crate::domain::repository::AuthRepository;
use crate::error::{AuthError, AuthResult};
use crate::presentation::cookies;
use crate::presentation::dto::{
    AuthResponse, LoginRequest, ProfileResponse, RefreshResponse, SessionResponse,
    SuccessResponse, UserResponse,
};
use crate::presentation::handlers::AuthAppState;

/// POST /auth/login
pub async fn login<R, M, G>(
    State(state): State<AuthAppState<R, M, G>>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> AuthResult<impl IntoResponse>
where
    R: AuthRepository,
    M: Mailer + Send + Sync + 'static,
    G: IdentityProvider + Send + Sync + 'static,
{
    let use_case = SignInUseCase::new(
        state.repo.clone(),
        state.repo.clone(),
        state.repo.clone(),
        state.tokens.clone(),
        state.config.clone(),
    );

    let input = SignInInput {
        email: req.email,
        password: req.password,
    };

    let current = cookies::session_token(&headers, &state.config);
    let output = use_case.execute(input, current.as_deref()).await?;

    Ok((
        StatusCode::OK,
        cookies::login_cookies(&state.config, &output.credentials),
        Json(AuthResponse {
            success: true,
            user: UserResponse::from(&output.user),
            token: output.credentials.access_token,
            refresh_token: output.credentials.refresh_token,
        }),
    ))
}

/// POST /auth/logout
///
/// Always succeeds and always clears the credential cookies.
pub async fn logout<R, M, G>(
    State(state): State<AuthAppState<R, M, G>>,
    headers: HeaderMap,
) -> impl IntoResponse
where
    R: AuthRepository,
    M: Mailer + Send + Sync + 'static,
    G: IdentityProvider + Send + Sync + 'static,
{
    let use_case = SignOutUseCase::new(state.repo.clone(), state.repo.clone(), state.config.clone());

    let session = cookies::session_token(&headers, &state.config);
    let refresh = cookies::refresh_token(&headers, &state.config);
    use_case
        .execute(session.as_deref(), refresh.as_deref())
        .await;

    (
        StatusCode::OK,
        cookies::clear_cookies(&state.config),
        Json(SuccessResponse { success: true }),
    )
}

/// POST /auth/refresh
pub async fn refresh<R, M, G>(
    State(state): State<AuthAppState<R, M, G>>,
    headers: HeaderMap,
) -> Response
where
    R: AuthRepository,
    M: Mailer + Send + Sync + 'static,
    G: IdentityProvider + Send + Sync + 'static,
{
    let use_case = RefreshUseCase::new(
        state.repo.clone(),
        state.repo.clone(),
        state.tokens.clone(),
        state.config.clone(),
    );

    let token = cookies::refresh_token(&headers, &state.config);
    match use_case.execute(token.as_deref()).await {
        Ok(output) => (
            StatusCode::OK,
            cookies::refresh_cookies(&state.config, &output),
            Json(RefreshResponse {
                success: true,
                token: output.access_token,
                refresh_token: output.refresh_token,
            }),
        )
            .into_response(),
        Err(AuthError::SessionExpired) => (
            cookies::clear_cookies(&state.config),
            AuthError::SessionExpired,
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /auth/session
pub async fn check_session<R, M, G>(
    State(state): State<AuthAppState<R, M, G>>,
    headers: HeaderMap,
) -> AuthResult<Response>
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

    let session = cookies::session_token(&headers, &state.config);
    let access = cookies::access_token(&headers, &state.config);

    let response = match use_case.execute(session.as_deref(), access.as_deref()).await? {
        SessionCheck::Authenticated {
            user,
            session_token,
        } => (
            cookies::session_cookie(&state.config, &session_token),
            Json(SessionResponse {
                authenticated: true,
                user: Some(UserResponse::from(&user)),
            }),
        )
            .into_response(),
        SessionCheck::Anonymous => Json(SessionResponse {
            authenticated: false,
            user: None,
        })
        .into_response(),
    };

    Ok(response)
}

/// GET /auth/me (behind `require_auth`)
pub async fn me(Extension(user): Extension<SessionUser>) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        success: true,
        user: UserResponse::from(user),
    })
}
