//! Entities

pub mod auth_session;
pub mod refresh_token;
pub mod user;
