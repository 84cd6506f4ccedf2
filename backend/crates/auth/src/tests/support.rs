//! In-memory adapters for flow and HTTP tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use chrono::{DateTime, Utc};
use platform::rate_limit::InMemoryRateLimitStore;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::application::config::AuthConfig;
use crate::domain::entity::{
    auth_session::AuthSession, refresh_token::RefreshTokenRecord, user::User,
};
use crate::domain::oauth::ExternalIdentity;
use crate::domain::port::{IdentityProvider, Mailer, OutgoingMail, TokenIssuer};
use crate::domain::repository::{
    AuthSessionRepository, Delivery, PasswordResetCheck, RefreshTokenRepository, UserRepository,
};
use crate::domain::value_object::{
    auth_provider::AuthProvider,
    email::Email,
    one_time_code::OneTimeCode,
    person_name::PersonName,
    user_id::UserId,
    user_password::{RawPassword, UserPassword},
};
use crate::error::{AuthError, AuthResult};
use crate::infra::jwt::JwtTokenIssuer;
use crate::presentation::handlers::AuthAppState;

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    sessions: HashMap<Uuid, AuthSession>,
    refresh_tokens: HashMap<String, RefreshTokenRecord>,
}

/// All three repositories over one lock. Transactional methods write only
/// after the delivery (or check) succeeded, which is what a rollback leaves.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub async fn user_by_email(&self, email: &str) -> Option<User> {
        let tables = self.tables.lock().await;
        tables
            .users
            .values()
            .find(|u| u.email.as_str() == email)
            .cloned()
    }

    pub async fn put_user(&self, user: User) {
        self.tables.lock().await.users.insert(*user.user_id.as_uuid(), user);
    }

    /// Mutate a stored account in place
    pub async fn edit_user(&self, email: &str, f: impl FnOnce(&mut User)) {
        let mut tables = self.tables.lock().await;
        if let Some(user) = tables.users.values_mut().find(|u| u.email.as_str() == email) {
            f(user);
        }
    }

    pub async fn session_count(&self) -> usize {
        self.tables.lock().await.sessions.len()
    }

    pub async fn sessions_of(&self, user_id: &UserId) -> usize {
        let tables = self.tables.lock().await;
        tables
            .sessions
            .values()
            .filter(|s| s.user_id.as_ref() == Some(user_id))
            .count()
    }

    pub async fn refresh_tokens_of(&self, user_id: &UserId) -> usize {
        let tables = self.tables.lock().await;
        tables
            .refresh_tokens
            .values()
            .filter(|r| &r.user_id == user_id)
            .count()
    }
}

fn find_by_email<'a>(tables: &'a Tables, email: &Email) -> Option<&'a User> {
    tables.users.values().find(|u| u.email == *email)
}

impl UserRepository for MemoryStore {
    async fn find_by_id(&self, user_id: &UserId) -> AuthResult<Option<User>> {
        Ok(self.tables.lock().await.users.get(user_id.as_uuid()).cloned())
    }

    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<User>> {
        Ok(find_by_email(&*self.tables.lock().await, email).cloned())
    }

    async fn create(&self, user: &User) -> AuthResult<()> {
        let mut tables = self.tables.lock().await;
        if find_by_email(&tables, &user.email).is_some() {
            return Err(AuthError::EmailExists);
        }
        tables.users.insert(*user.user_id.as_uuid(), user.clone());
        Ok(())
    }

    async fn create_pending(&self, user: &User, deliver: Delivery<'_>) -> AuthResult<()> {
        let mut tables = self.tables.lock().await;

        let stale = match find_by_email(&tables, &user.email) {
            Some(existing) if existing.is_active => return Err(AuthError::EmailExists),
            Some(existing) => Some(existing.user_id),
            None => None,
        };

        deliver.await?;

        if let Some(stale) = stale {
            tables.users.remove(stale.as_uuid());
        }
        tables.users.insert(*user.user_id.as_uuid(), user.clone());
        Ok(())
    }

    async fn activate(
        &self,
        email: &Email,
        code: &OneTimeCode,
        now: DateTime<Utc>,
    ) -> AuthResult<Option<User>> {
        let mut tables = self.tables.lock().await;
        let Some(user) = tables.users.values_mut().find(|u| u.email == *email) else {
            return Ok(None);
        };

        let matches = user.auth_provider == AuthProvider::Email
            && !user.is_active
            && user.activation_code.as_ref().is_some_and(|c| c.matches(code))
            && user.activation_expiry.is_some_and(|e| e > now);
        if !matches {
            return Ok(None);
        }

        user.activate(now);
        Ok(Some(user.clone()))
    }

    async fn store_activation_code(&self, user: &User, deliver: Delivery<'_>) -> AuthResult<()> {
        let mut tables = self.tables.lock().await;
        deliver.await?;
        if let Some(row) = tables.users.get_mut(user.user_id.as_uuid()) {
            row.activation_code = user.activation_code.clone();
            row.activation_expiry = user.activation_expiry;
            row.updated_at = user.updated_at;
        }
        Ok(())
    }

    async fn store_reset_code(&self, user: &User, deliver: Delivery<'_>) -> AuthResult<()> {
        let mut tables = self.tables.lock().await;
        deliver.await?;
        if let Some(row) = tables.users.get_mut(user.user_id.as_uuid()) {
            row.reset_code = user.reset_code.clone();
            row.reset_code_expires_at = user.reset_code_expires_at;
            row.updated_at = user.updated_at;
        }
        Ok(())
    }

    async fn save_login_state(&self, user: &User) -> AuthResult<()> {
        let mut tables = self.tables.lock().await;
        if let Some(row) = tables.users.get_mut(user.user_id.as_uuid()) {
            row.login_attempts = user.login_attempts;
            row.last_login = user.last_login;
            row.last_failed_attempt_at = user.last_failed_attempt_at;
            row.updated_at = user.updated_at;
        }
        Ok(())
    }

    async fn link_google(&self, user: &User) -> AuthResult<()> {
        let mut tables = self.tables.lock().await;
        if let Some(row) = tables.users.get_mut(user.user_id.as_uuid()) {
            row.google_id = user.google_id.clone();
            row.last_login = user.last_login;
            row.updated_at = user.updated_at;
        }
        Ok(())
    }

    async fn reset_password(
        &self,
        email: &Email,
        check: PasswordResetCheck<'_>,
    ) -> AuthResult<User> {
        let mut tables = self.tables.lock().await;
        let mut user = find_by_email(&tables, email)
            .cloned()
            .ok_or(AuthError::UserNotFound)?;

        let password = check(&user)?;
        user.apply_password_reset(password, Utc::now());

        tables.users.insert(*user.user_id.as_uuid(), user.clone());
        tables
            .refresh_tokens
            .retain(|_, record| record.user_id != user.user_id);
        Ok(user)
    }
}

impl AuthSessionRepository for MemoryStore {
    async fn create(&self, session: &AuthSession) -> AuthResult<()> {
        let mut tables = self.tables.lock().await;
        tables.sessions.insert(session.session_id, session.clone());
        Ok(())
    }

    async fn find_by_id(&self, session_id: Uuid) -> AuthResult<Option<AuthSession>> {
        Ok(self.tables.lock().await.sessions.get(&session_id).cloned())
    }

    async fn update(&self, session: &AuthSession) -> AuthResult<()> {
        let mut tables = self.tables.lock().await;
        if let Some(row) = tables.sessions.get_mut(&session.session_id) {
            *row = session.clone();
        }
        Ok(())
    }

    async fn delete(&self, session_id: Uuid) -> AuthResult<()> {
        self.tables.lock().await.sessions.remove(&session_id);
        Ok(())
    }

    async fn delete_all_for_user(&self, user_id: &UserId) -> AuthResult<u64> {
        let mut tables = self.tables.lock().await;
        let before = tables.sessions.len();
        tables
            .sessions
            .retain(|_, s| s.user_id.as_ref() != Some(user_id));
        Ok((before - tables.sessions.len()) as u64)
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let now = Utc::now();
        let mut tables = self.tables.lock().await;
        let before = tables.sessions.len();
        tables.sessions.retain(|_, s| !s.is_expired(now));
        Ok((before - tables.sessions.len()) as u64)
    }
}

impl RefreshTokenRepository for MemoryStore {
    async fn insert(&self, record: &RefreshTokenRecord) -> AuthResult<()> {
        let mut tables = self.tables.lock().await;
        tables
            .refresh_tokens
            .insert(record.token.clone(), record.clone());
        Ok(())
    }

    async fn rotate(
        &self,
        old_token: &str,
        next: &RefreshTokenRecord,
        now: DateTime<Utc>,
    ) -> AuthResult<bool> {
        let mut tables = self.tables.lock().await;
        let valid = tables
            .refresh_tokens
            .get(old_token)
            .is_some_and(|r| r.user_id == next.user_id && !r.is_expired(now));
        if !valid {
            return Ok(false);
        }

        tables.refresh_tokens.remove(old_token);
        tables
            .refresh_tokens
            .insert(next.token.clone(), next.clone());
        Ok(true)
    }

    async fn revoke(&self, token: &str) -> AuthResult<()> {
        self.tables.lock().await.refresh_tokens.remove(token);
        Ok(())
    }

    async fn revoke_all_for_user(&self, user_id: &UserId) -> AuthResult<u64> {
        let mut tables = self.tables.lock().await;
        let before = tables.refresh_tokens.len();
        tables.refresh_tokens.retain(|_, r| &r.user_id != user_id);
        Ok((before - tables.refresh_tokens.len()) as u64)
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let now = Utc::now();
        let mut tables = self.tables.lock().await;
        let before = tables.refresh_tokens.len();
        tables.refresh_tokens.retain(|_, r| !r.is_expired(now));
        Ok((before - tables.refresh_tokens.len()) as u64)
    }
}

/// Records every mail; can be switched to fail.
#[derive(Default)]
pub struct CapturingMailer {
    sent: StdMutex<Vec<OutgoingMail>>,
    failing: AtomicBool,
}

impl CapturingMailer {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().map(|s| s.len()).unwrap_or_default()
    }

    /// The code in the latest mail to `email`
    pub fn last_code_for(&self, email: &str) -> Option<String> {
        let sent = self.sent.lock().ok()?;
        let mail = sent.iter().rev().find(|m| m.to.as_str() == email)?;

        let marker = "text-align: center;\">";
        let start = mail.html.find(marker)? + marker.len();
        mail.html.get(start..start + 6).map(str::to_string)
    }
}

impl Mailer for CapturingMailer {
    async fn send(&self, mail: OutgoingMail) -> AuthResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AuthError::EmailDelivery("connection refused".to_string()));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(mail);
        }
        Ok(())
    }
}

/// Identity provider answering from a fixed code table
#[derive(Default)]
pub struct FakeIdentity {
    identities: StdMutex<HashMap<String, ExternalIdentity>>,
}

impl FakeIdentity {
    pub fn register(&self, code: &str, sub: &str, email: &str) {
        let identity = ExternalIdentity {
            provider_id: sub.to_string(),
            email: Email::new(email).unwrap(),
            first_name: Some("Grace".to_string()),
            last_name: Some("Hopper".to_string()),
        };
        self.identities
            .lock()
            .unwrap()
            .insert(code.to_string(), identity);
    }
}

impl IdentityProvider for FakeIdentity {
    fn authorize_url(&self, state: &str) -> AuthResult<String> {
        Ok(format!("https://accounts.example/auth?state={}", state))
    }

    async fn exchange_code(&self, code: &str) -> AuthResult<ExternalIdentity> {
        let identities = self
            .identities
            .lock()
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        identities
            .get(code)
            .cloned()
            .ok_or_else(|| AuthError::Internal("unknown code".to_string()))
    }
}

pub type TestState = AuthAppState<MemoryStore, CapturingMailer, FakeIdentity>;

/// Wiring shared by flow and HTTP tests
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<CapturingMailer>,
    pub identity: Arc<FakeIdentity>,
    pub tokens: Arc<dyn TokenIssuer>,
    pub config: Arc<AuthConfig>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(AuthConfig::development())
    }

    pub fn with_config(config: AuthConfig) -> Self {
        Self {
            store: Arc::new(MemoryStore::default()),
            mailer: Arc::new(CapturingMailer::default()),
            identity: Arc::new(FakeIdentity::default()),
            tokens: Arc::new(JwtTokenIssuer::new(
                b"test-access-secret",
                b"test-refresh-secret",
                chrono::Duration::days(7),
            )),
            config: Arc::new(config),
        }
    }

    pub fn state(&self) -> TestState {
        AuthAppState {
            repo: self.store.clone(),
            mailer: self.mailer.clone(),
            identity: self.identity.clone(),
            tokens: self.tokens.clone(),
            config: self.config.clone(),
            limits: Arc::new(InMemoryRateLimitStore::new()),
        }
    }

    /// Insert an active email account directly
    pub async fn active_email_user(&self, email: &str, password: &str) -> User {
        let raw = RawPassword::new(password.to_string()).unwrap();
        let mut user = User::new_pending(
            Email::new(email).unwrap(),
            PersonName::new("Ada").unwrap(),
            PersonName::new("Lovelace").unwrap(),
            UserPassword::from_raw(&raw, self.config.pepper()).unwrap(),
            OneTimeCode::generate(),
            chrono::Duration::minutes(15),
            Utc::now(),
        );
        user.activate(Utc::now());
        self.store.put_user(user.clone()).await;
        user
    }

    /// Insert an active Google account directly
    pub async fn google_user(&self, email: &str) -> User {
        let user = User::new_google(
            Email::new(email).unwrap(),
            PersonName::new("Grace").unwrap(),
            PersonName::new("Hopper").unwrap(),
            "google-sub".to_string(),
            Utc::now(),
        );
        self.store.put_user(user.clone()).await;
        user
    }
}
