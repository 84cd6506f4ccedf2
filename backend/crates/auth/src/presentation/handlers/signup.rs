//! Signup and activation handlers

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;

use crate::application::{ActivateUseCase, ResendActivationUseCase, SignUpInput, SignUpUseCase};
use crate::domain::port::{IdentityProvider, Mailer};
use crate::domain::repository::AuthRepository;
use crate::error::AuthResult;
use crate::presentation::cookies;
use crate::presentation::dto::{
    ActivateRequest, AuthResponse, EmailRequest, MessageResponse, SignUpRequest, SignUpResponse,
    UserResponse,
};
use crate::presentation::handlers::AuthAppState;

/// POST /signup
pub async fn sign_up<R, M, G>(
    State(state): State<AuthAppState<R, M, G>>,
    Json(req): Json<SignUpRequest>,
) -> AuthResult<impl IntoResponse>
where
    R: AuthRepository,
    M: Mailer + Send + Sync + 'static,
    G: IdentityProvider + Send + Sync + 'static,
{
    let use_case = SignUpUseCase::new(state.repo.clone(), state.mailer.clone(), state.config.clone());

    let output = use_case
        .execute(SignUpInput {
            first_name: req.first_name,
            last_name: req.last_name,
            email: req.email,
            password: req.password,
            confirm_password: req.confirm_password,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SignUpResponse {
            success: true,
            message: "Account created. Check your email for the activation code.".to_string(),
            redirect: output.redirect,
        }),
    ))
}

/// POST /activate
pub async fn activate<R, M, G>(
    State(state): State<AuthAppState<R, M, G>>,
    headers: HeaderMap,
    Json(req): Json<ActivateRequest>,
) -> AuthResult<impl IntoResponse>
where
    R: AuthRepository,
    M: Mailer + Send + Sync + 'static,
    G: IdentityProvider + Send + Sync + 'static,
{
    let use_case = ActivateUseCase::new(
        state.repo.clone(),
        state.repo.clone(),
        state.repo.clone(),
        state.tokens.clone(),
        state.config.clone(),
    );

    let current = cookies::session_token(&headers, &state.config);
    let output = use_case
        .execute(&req.email, &req.code, current.as_deref())
        .await?;

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

/// POST /resend-code
pub async fn resend_code<R, M, G>(
    State(state): State<AuthAppState<R, M, G>>,
    Json(req): Json<EmailRequest>,
) -> AuthResult<Json<MessageResponse>>
where
    R: AuthRepository,
    M: Mailer + Send + Sync + 'static,
    G: IdentityProvider + Send + Sync + 'static,
{
    let use_case =
        ResendActivationUseCase::new(state.repo.clone(), state.mailer.clone(), state.config.clone());

    use_case.execute(&req.email).await?;

    Ok(Json(MessageResponse::new("A new activation code has been sent.")))
}
