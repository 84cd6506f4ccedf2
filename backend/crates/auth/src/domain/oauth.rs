//! Google Federation Rules
//!
//! What a verified Google identity does to the account table, decided
//! without any I/O.
//!
//! | existing | signup | outcome |
//! |---|---|---|
//! | none | yes | create an active Google account |
//! | none | no | `google_account_not_found` |
//! | google | yes | `existing_account` |
//! | google | no | log in, link `google_id` |
//! | email | any | `existing_account_diff_provider` |

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::entity::user::User;
use crate::domain::value_object::{
    auth_provider::AuthProvider, email::Email, person_name::PersonName,
};

/// Identity asserted by the external provider
#[derive(Debug, Clone)]
pub struct ExternalIdentity {
    /// Provider-side stable subject
    pub provider_id: String,
    pub email: Email,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Successful reconciliation
#[derive(Debug)]
pub enum Reconciled {
    /// New account to insert
    Created(User),
    /// Existing account to update (google_id, last_login)
    LoggedIn(User),
}

impl Reconciled {
    pub fn user(&self) -> &User {
        match self {
            Reconciled::Created(user) | Reconciled::LoggedIn(user) => user,
        }
    }
}

/// Reasons a federated attempt is refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error("No account exists for this Google identity")]
    AccountNotFound,
    #[error("An account already exists for this Google identity")]
    ExistingAccount,
    #[error("This email is registered with a password")]
    ExistingAccountDiffProvider,
}

impl ReconcileError {
    /// Query-string reason sent back to the frontend
    pub fn reason_code(&self) -> &'static str {
        match self {
            ReconcileError::AccountNotFound => "google_account_not_found",
            ReconcileError::ExistingAccount => "existing_account",
            ReconcileError::ExistingAccountDiffProvider => "existing_account_diff_provider",
        }
    }
}

/// Decide the outcome of a Google callback.
///
/// Accounts of another provider are never merged or modified.
pub fn reconcile(
    existing: Option<&User>,
    identity: &ExternalIdentity,
    signup: bool,
    now: DateTime<Utc>,
) -> Result<Reconciled, ReconcileError> {
    match (existing, signup) {
        (Some(user), _) if user.auth_provider != AuthProvider::Google => {
            Err(ReconcileError::ExistingAccountDiffProvider)
        }
        (Some(_), true) => Err(ReconcileError::ExistingAccount),
        (Some(user), false) => {
            let mut user = user.clone();
            user.link_google(identity.provider_id.clone(), now);
            Ok(Reconciled::LoggedIn(user))
        }
        (None, true) => Ok(Reconciled::Created(User::new_google(
            identity.email.clone(),
            PersonName::from_provider(identity.first_name.as_deref()),
            PersonName::from_provider(identity.last_name.as_deref()),
            identity.provider_id.clone(),
            now,
        ))),
        (None, false) => Err(ReconcileError::AccountNotFound),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> ExternalIdentity {
        ExternalIdentity {
            provider_id: "google-sub-1".into(),
            email: Email::new("grace@example.com").unwrap(),
            first_name: Some("Grace".into()),
            last_name: None,
        }
    }

    fn existing(provider: AuthProvider) -> User {
        let mut user = User::new_google(
            Email::new("grace@example.com").unwrap(),
            PersonName::new("Grace").unwrap(),
            PersonName::new("Hopper").unwrap(),
            "old-sub".into(),
            Utc::now(),
        );
        user.auth_provider = provider;
        if provider == AuthProvider::Email {
            user.google_id = None;
        }
        user
    }

    #[test]
    fn test_new_signup_creates_active_google_account() {
        let outcome = reconcile(None, &identity(), true, Utc::now()).unwrap();
        let Reconciled::Created(user) = outcome else {
            panic!("expected Created");
        };
        assert!(user.is_active);
        assert_eq!(user.auth_provider, AuthProvider::Google);
        assert_eq!(user.google_id.as_deref(), Some("google-sub-1"));
        assert!(user.password.is_none());
        assert_eq!(user.first_name.as_str(), "Grace");
    }

    #[test]
    fn test_login_without_account() {
        let err = reconcile(None, &identity(), false, Utc::now()).unwrap_err();
        assert_eq!(err.reason_code(), "google_account_not_found");
    }

    #[test]
    fn test_google_account_signup_again() {
        let user = existing(AuthProvider::Google);
        let err = reconcile(Some(&user), &identity(), true, Utc::now()).unwrap_err();
        assert_eq!(err, ReconcileError::ExistingAccount);
    }

    #[test]
    fn test_google_account_login_links_id() {
        let user = existing(AuthProvider::Google);
        let now = Utc::now();
        let outcome = reconcile(Some(&user), &identity(), false, now).unwrap();
        let Reconciled::LoggedIn(updated) = outcome else {
            panic!("expected LoggedIn");
        };
        assert_eq!(updated.user_id, user.user_id);
        assert_eq!(updated.google_id.as_deref(), Some("google-sub-1"));
        assert_eq!(updated.last_login, Some(now));
    }

    #[test]
    fn test_email_account_is_never_touched() {
        let user = existing(AuthProvider::Email);
        for signup in [true, false] {
            let err = reconcile(Some(&user), &identity(), signup, Utc::now()).unwrap_err();
            assert_eq!(err.reason_code(), "existing_account_diff_provider");
        }
    }
}
