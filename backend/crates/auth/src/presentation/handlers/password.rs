//! Password reset handlers

use axum::Json;
use axum::extract::State;

use crate::application::{PasswordResetUseCase, ResetConfirmInput};
use crate::domain::port::{IdentityProvider, Mailer};
use crate::domain::repository::AuthRepository;
use crate::error::AuthResult;
use crate::presentation::dto::{EmailRequest, MessageResponse, ResetPasswordRequest};
use crate::presentation::handlers::AuthAppState;

fn use_case<R, M, G>(state: &AuthAppState<R, M, G>) -> PasswordResetUseCase<R, R, M>
where
    R: AuthRepository,
    M: Mailer + Send + Sync + 'static,
    G: IdentityProvider + Send + Sync + 'static,
{
    PasswordResetUseCase::new(
        state.repo.clone(),
        state.repo.clone(),
        state.mailer.clone(),
        state.config.clone(),
    )
}

/// POST /forgot-password
pub async fn forgot_password<R, M, G>(
    State(state): State<AuthAppState<R, M, G>>,
    Json(req): Json<EmailRequest>,
) -> AuthResult<Json<MessageResponse>>
where
    R: AuthRepository,
    M: Mailer + Send + Sync + 'static,
    G: IdentityProvider + Send + Sync + 'static,
{
    use_case(&state).request(&req.email).await?;

    Ok(Json(MessageResponse::new(
        "A password reset code has been sent to your email.",
    )))
}

/// POST /resend-reset-code
pub async fn resend_reset_code<R, M, G>(
    State(state): State<AuthAppState<R, M, G>>,
    Json(req): Json<EmailRequest>,
) -> AuthResult<Json<MessageResponse>>
where
    R: AuthRepository,
    M: Mailer + Send + Sync + 'static,
    G: IdentityProvider + Send + Sync + 'static,
{
    use_case(&state).resend(&req.email).await?;

    Ok(Json(MessageResponse::new(
        "A new password reset code has been sent to your email.",
    )))
}

/// POST /reset-password
pub async fn reset_password<R, M, G>(
    State(state): State<AuthAppState<R, M, G>>,
    Json(req): Json<ResetPasswordRequest>,
) -> AuthResult<Json<MessageResponse>>
where
    R: AuthRepository,
    M: Mailer + Send + Sync + 'static,
    G: IdentityProvider + Send + Sync + 'static,
{
    use_case(&state)
        .confirm(ResetConfirmInput {
            email: req.email,
            code: req.code,
            new_password: req.new_password,
        })
        .await?;

    Ok(Json(MessageResponse::new(
        "Your password has been reset. You can now log in.",
    )))
}
