//! Infrastructure Layer
//!
//! Database implementations and external service integrations.

pub mod google;
pub mod jwt;
pub mod mail;
pub mod postgres;

pub use google::{GoogleIdentityProvider, GoogleSettings};
pub use jwt::JwtTokenIssuer;
pub use mail::{LogMailer, MailTransport, SmtpMailer, SmtpSettings};
pub use postgres::PgAuthRepository;
