//! Application Layer
//!
//! Use cases and application services.

pub mod activate;
pub mod check_session;
pub mod config;
pub mod credentials;
pub mod mail;
pub mod oauth;
pub mod password_reset;
pub mod refresh;
pub mod session;
pub mod sign_in;
pub mod sign_out;
pub mod sign_up;

// Re-exports
pub use activate::{ActivateUseCase, ResendActivationUseCase};
pub use check_session::{CheckSessionUseCase, SessionCheck};
pub use config::AuthConfig;
pub use credentials::{CredentialIssuer, IssuedCredentials};
pub use oauth::{CallbackParams, OAuthFailure, OAuthFailureReason, OAuthStart, OAuthUseCase};
pub use password_reset::{PasswordResetUseCase, ResetConfirmInput};
pub use refresh::{RefreshOutput, RefreshUseCase};
pub use session::SessionManager;
pub use sign_in::{SignInInput, SignInOutput, SignInUseCase};
pub use sign_out::SignOutUseCase;
pub use sign_up::{SignUpInput, SignUpOutput, SignUpUseCase};
