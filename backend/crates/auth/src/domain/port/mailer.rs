//! Mail delivery port

use crate::domain::value_object::email::Email;
use crate::error::AuthResult;

/// A rendered message ready to send
#[derive(Debug, Clone)]
pub struct OutgoingMail {
    pub to: Email,
    pub subject: String,
    pub html: String,
}

#[trait_variant::make(Mailer: Send)]
pub trait LocalMailer {
    /// Deliver `mail`; failures map to `AuthError::EmailDelivery`.
    async fn send(&self, mail: OutgoingMail) -> AuthResult<()>;
}
