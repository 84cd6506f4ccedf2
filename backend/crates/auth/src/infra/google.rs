//! Google OAuth 2.0 / OpenID Connect identity provider

use std::time::Duration;

use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    RedirectUrl, Scope, TokenResponse, TokenUrl, basic::BasicClient,
};
use serde::Deserialize;

use crate::domain::oauth::ExternalIdentity;
use crate::domain::port::IdentityProvider;
use crate::domain::value_object::email::Email;
use crate::error::{AuthError, AuthResult};

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

type GoogleClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Google client credentials
#[derive(Debug, Clone)]
pub struct GoogleSettings {
    pub client_id: String,
    pub client_secret: String,
    /// Must match the URI registered with Google
    pub redirect_url: String,
}

pub struct GoogleIdentityProvider {
    client: GoogleClient,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct GoogleUserInfo {
    sub: String,
    email: String,
    #[serde(default)]
    email_verified: bool,
    given_name: Option<String>,
    family_name: Option<String>,
}

impl GoogleIdentityProvider {
    pub fn new(settings: GoogleSettings) -> AuthResult<Self> {
        let config_error = |e: oauth2::url::ParseError| {
            AuthError::Internal(format!("Invalid Google OAuth URL: {}", e))
        };

        let client = BasicClient::new(ClientId::new(settings.client_id))
            .set_client_secret(ClientSecret::new(settings.client_secret))
            .set_auth_uri(AuthUrl::new(AUTH_URL.to_string()).map_err(config_error)?)
            .set_token_uri(TokenUrl::new(TOKEN_URL.to_string()).map_err(config_error)?)
            .set_redirect_uri(RedirectUrl::new(settings.redirect_url).map_err(config_error)?);

        // No redirects: the token endpoint must answer directly.
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| AuthError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, http })
    }

    async fn fetch_userinfo(&self, access_token: &str) -> AuthResult<GoogleUserInfo> {
        let response = self
            .http
            .get(USERINFO_URL)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::Internal(format!("Failed to fetch Google user info: {}", e)))?
            .error_for_status()
            .map_err(|e| AuthError::Internal(format!("Google user info rejected: {}", e)))?;

        response
            .json()
            .await
            .map_err(|e| AuthError::Internal(format!("Failed to parse Google user info: {}", e)))
    }
}

impl IdentityProvider for GoogleIdentityProvider {
    fn authorize_url(&self, state: &str) -> AuthResult<String> {
        let state = state.to_string();
        let (url, _) = self
            .client
            .authorize_url(|| CsrfToken::new(state))
            .add_scope(Scope::new("openid".to_string()))
            .add_scope(Scope::new("email".to_string()))
            .add_scope(Scope::new("profile".to_string()))
            .add_extra_param("prompt", "select_account")
            .url();

        Ok(url.to_string())
    }

    async fn exchange_code(&self, code: &str) -> AuthResult<ExternalIdentity> {
        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| AuthError::Internal(format!("Token exchange failed: {}", e)))?;

        let info = self.fetch_userinfo(token.access_token().secret()).await?;
        if !info.email_verified {
            return Err(AuthError::Internal(
                "Google account email is not verified".to_string(),
            ));
        }

        Ok(ExternalIdentity {
            provider_id: info.sub,
            email: Email::new(&info.email)?,
            first_name: info.given_name,
            last_name: info.family_name,
        })
    }
}
