//! Domain Layer
//!
//! Contains entities, value objects, repository traits, outbound ports and
//! the Google federation rules.

pub mod entity;
pub mod oauth;
pub mod port;
pub mod repository;
pub mod value_object;

// Re-exports
pub use entity::{auth_session::AuthSession, refresh_token::RefreshTokenRecord, user::User};
pub use repository::{
    AuthRepository, AuthSessionRepository, RefreshTokenRepository, UserRepository,
};
