//! Sign Up Use Case
//!
//! Creates an inactive email account and mails its activation code.

use std::sync::Arc;

use chrono::Utc;

use crate::application::config::{AuthConfig, span};
use crate::application::mail::activation_mail;
use crate::domain::entity::user::User;
use crate::domain::port::Mailer;
use crate::domain::repository::UserRepository;
use crate::domain::value_object::{
    email::Email,
    one_time_code::OneTimeCode,
    person_name::PersonName,
    user_password::RawPassword,
};
use crate::error::{AuthError, AuthResult};

/// Sign up input
pub struct SignUpInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Sign up output
#[derive(Debug)]
pub struct SignUpOutput {
    pub email: Email,
    /// Frontend path of the activation page
    pub redirect: String,
}

/// Sign up use case
pub struct SignUpUseCase<U, M>
where
    U: UserRepository,
    M: Mailer,
{
    user_repo: Arc<U>,
    mailer: Arc<M>,
    config: Arc<AuthConfig>,
}

impl<U, M> SignUpUseCase<U, M>
where
    U: UserRepository,
    M: Mailer,
{
    pub fn new(user_repo: Arc<U>, mailer: Arc<M>, config: Arc<AuthConfig>) -> Self {
        Self {
            user_repo,
            mailer,
            config,
        }
    }

    pub async fn execute(&self, input: SignUpInput) -> AuthResult<SignUpOutput> {
        let missing: Vec<&'static str> = [
            ("firstName", &input.first_name),
            ("lastName", &input.last_name),
            ("email", &input.email),
            ("password", &input.password),
            ("confirmPassword", &input.confirm_password),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();
        if !missing.is_empty() {
            return Err(AuthError::MissingFields(missing));
        }

        if input.password != input.confirm_password {
            return Err(AuthError::PasswordMismatch);
        }

        // Validate before anything touches the database
        let raw_password = RawPassword::new_strong(input.password, &self.config.password_policy)?;
        let email = Email::new(&input.email)?;
        let first_name = PersonName::new(&input.first_name)?;
        let last_name = PersonName::new(&input.last_name)?;

        let password = raw_password
            .hash_blocking(self.config.password_pepper.clone())
            .await?;
        let code = OneTimeCode::generate();

        let user = User::new_pending(
            email.clone(),
            first_name,
            last_name,
            password,
            code.clone(),
            span(self.config.code_ttl),
            Utc::now(),
        );

        let mail = activation_mail(&user, &code, self.config.code_ttl);

        // Insert and send together: a failed send leaves no account behind.
        self.user_repo
            .create_pending(&user, Box::pin(self.mailer.send(mail)))
            .await?;

        tracing::info!(
            user_id = %user.user_id,
            email = %email.masked(),
            "User signed up"
        );

        let redirect = format!("/activate?email={}", urlencoding::encode(email.as_str()));

        Ok(SignUpOutput { email, redirect })
    }
}
