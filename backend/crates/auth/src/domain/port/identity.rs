//! External identity provider port (Google)

use crate::domain::oauth::ExternalIdentity;
use crate::error::AuthResult;

#[trait_variant::make(IdentityProvider: Send)]
pub trait LocalIdentityProvider {
    /// Consent URL carrying `state`
    fn authorize_url(&self, state: &str) -> AuthResult<String>;

    /// Trade an authorization code for the verified identity behind it.
    async fn exchange_code(&self, code: &str) -> AuthResult<ExternalIdentity>;
}
