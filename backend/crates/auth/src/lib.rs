//! Auth (Authentication) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Business logic, entities, repository traits and ports
//! - `application/` - Use cases and application services
//! - `infra/` - Postgres, JWT, SMTP and Google adapters
//! - `presentation/` - HTTP handlers, DTOs, router
//!
//! ## Features
//! - Email signup with a mailed 6-digit activation code
//! - Email + password login with per-account lockout
//! - Google sign-in with signup/login intent and provider isolation
//! - Server-side sessions plus JWT access and rotating refresh tokens
//! - Password reset by mailed code with a resend cooldown
//!
//! ## Security Model
//! - Passwords hashed with Argon2id (optional pepper)
//! - Session ids regenerated at every login and before the Google redirect
//! - Refresh tokens are single-use and allow-listed in the database
//! - An account only ever signs in with the provider it was created with

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

#[cfg(test)]
mod tests;

// Re-exports for convenience
pub use application::config::AuthConfig;
pub use error::{AuthError, AuthResult};
pub use infra::{
    GoogleIdentityProvider, GoogleSettings, JwtTokenIssuer, MailTransport, PgAuthRepository,
    SmtpSettings,
};
pub use presentation::router::{auth_router, auth_router_generic};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

pub mod models {
    pub use crate::domain::entity::*;
    pub use crate::domain::value_object::*;
    pub use crate::presentation::dto::*;
}
