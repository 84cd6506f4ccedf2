//! Outbound Ports
//!
//! Capabilities the use cases depend on without knowing the vendor.

pub mod identity;
pub mod mailer;
pub mod token;

pub use identity::IdentityProvider;
pub use mailer::{Mailer, OutgoingMail};
pub use token::{AccessClaims, IssuedRefreshToken, RefreshClaims, TokenIssuer};
