//! PostgreSQL Repository Implementations

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use crate::domain::entity::auth_session::{AuthSession, SessionData};
use crate::domain::entity::{refresh_token::RefreshTokenRecord, user::User};
use crate::domain::repository::{
    AuthSessionRepository, Delivery, PasswordResetCheck, RefreshTokenRepository, UserRepository,
};
use crate::domain::value_object::{
    auth_provider::AuthProvider, email::Email, one_time_code::OneTimeCode,
    person_name::PersonName, user_id::UserId, user_password::UserPassword,
};
use crate::error::{AuthError, AuthResult};

const USER_COLUMNS: &str = r#"
    user_id,
    email,
    first_name,
    last_name,
    password_hash,
    auth_provider,
    is_active,
    activation_code,
    activation_expiry,
    reset_code,
    reset_code_expires_at,
    login_attempts,
    last_login,
    last_failed_attempt_at,
    google_id,
    created_at,
    updated_at
"#;

/// PostgreSQL-backed auth repository
#[derive(Clone)]
pub struct PgAuthRepository {
    pool: PgPool,
}

impl PgAuthRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Delete expired sessions and refresh tokens.
    ///
    /// Returns `(sessions, refresh_tokens)` deleted.
    pub async fn purge_expired(&self) -> AuthResult<(u64, u64)> {
        let sessions = self.delete_expired_sessions().await?;
        let tokens = self.delete_expired_refresh_tokens().await?;

        tracing::info!(
            sessions_deleted = sessions,
            refresh_tokens_deleted = tokens,
            "Cleaned up expired auth state"
        );

        Ok((sessions, tokens))
    }

    async fn delete_expired_sessions(&self) -> AuthResult<u64> {
        let now_ms = Utc::now().timestamp_millis();

        let deleted = sqlx::query("DELETE FROM auth_sessions WHERE expires_at_ms <= $1")
            .bind(now_ms)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted)
    }

    async fn delete_expired_refresh_tokens(&self) -> AuthResult<u64> {
        let deleted = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= $1")
            .bind(Utc::now())
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted)
    }

    async fn find_user_where(&self, filter: &str, bind: &str) -> AuthResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {filter}");

        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(bind)
            .fetch_optional(&self.pool)
            .await?;

        row.map(UserRow::into_user).transpose()
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_unique_violation())
}

// ============================================================================
// User Repository Implementation
// ============================================================================

impl UserRepository for PgAuthRepository {
    async fn find_by_id(&self, user_id: &UserId) -> AuthResult<Option<User>> {
        self.find_user_where("user_id = $1::uuid", &user_id.to_string())
            .await
    }

    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<User>> {
        self.find_user_where("email_normalized = $1", email.as_str())
            .await
    }

    async fn create(&self, user: &User) -> AuthResult<()> {
        insert_user(&self.pool, user).await.map_err(|e| {
            if is_unique_violation(&e) {
                AuthError::EmailExists
            } else {
                e.into()
            }
        })
    }

    async fn create_pending(&self, user: &User, deliver: Delivery<'_>) -> AuthResult<()> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, (Uuid, bool)>(
            "SELECT user_id, is_active FROM users WHERE email_normalized = $1 FOR UPDATE",
        )
        .bind(user.email.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        match existing {
            Some((_, true)) => return Err(AuthError::EmailExists),
            Some((stale_id, false)) => {
                sqlx::query("DELETE FROM users WHERE user_id = $1")
                    .bind(stale_id)
                    .execute(&mut *tx)
                    .await?;
                tracing::debug!(user_id = %stale_id, "Replaced stale inactive account");
            }
            None => {}
        }

        insert_user(&mut *tx, user).await.map_err(|e| {
            if is_unique_violation(&e) {
                AuthError::EmailExists
            } else {
                e.into()
            }
        })?;

        // Dropping `tx` on a failed send rolls the insert back.
        deliver.await?;
        tx.commit().await?;

        Ok(())
    }

    async fn activate(
        &self,
        email: &Email,
        code: &OneTimeCode,
        now: DateTime<Utc>,
    ) -> AuthResult<Option<User>> {
        let sql = format!(
            r#"
            UPDATE users SET
                is_active = TRUE,
                activation_code = NULL,
                activation_expiry = NULL,
                updated_at = $3
            WHERE email_normalized = $1
              AND auth_provider = 'email'
              AND is_active = FALSE
              AND activation_code = $2
              AND activation_expiry > $3
            RETURNING {USER_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(email.as_str())
            .bind(code.as_str())
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;

        row.map(UserRow::into_user).transpose()
    }

    async fn store_activation_code(&self, user: &User, deliver: Delivery<'_>) -> AuthResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE users SET
                activation_code = $2,
                activation_expiry = $3,
                updated_at = $4
            WHERE user_id = $1
            "#,
        )
        .bind(user.user_id.as_uuid())
        .bind(user.activation_code.as_ref().map(|c| c.as_str()))
        .bind(user.activation_expiry)
        .bind(user.updated_at)
        .execute(&mut *tx)
        .await?;

        deliver.await?;
        tx.commit().await?;

        Ok(())
    }

    async fn store_reset_code(&self, user: &User, deliver: Delivery<'_>) -> AuthResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE users SET
                reset_code = $2,
                reset_code_expires_at = $3,
                updated_at = $4
            WHERE user_id = $1
            "#,
        )
        .bind(user.user_id.as_uuid())
        .bind(user.reset_code.as_ref().map(|c| c.as_str()))
        .bind(user.reset_code_expires_at)
        .bind(user.updated_at)
        .execute(&mut *tx)
        .await?;

        deliver.await?;
        tx.commit().await?;

        Ok(())
    }

    async fn save_login_state(&self, user: &User) -> AuthResult<()> {
        sqlx::query(
            r#"
            UPDATE users SET
                login_attempts = $2,
                last_login = $3,
                last_failed_attempt_at = $4,
                updated_at = $5
            WHERE user_id = $1
            "#,
        )
        .bind(user.user_id.as_uuid())
        .bind(user.login_attempts)
        .bind(user.last_login)
        .bind(user.last_failed_attempt_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn link_google(&self, user: &User) -> AuthResult<()> {
        sqlx::query(
            r#"
            UPDATE users SET
                google_id = $2,
                last_login = $3,
                updated_at = $4
            WHERE user_id = $1
            "#,
        )
        .bind(user.user_id.as_uuid())
        .bind(&user.google_id)
        .bind(user.last_login)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn reset_password(
        &self,
        email: &Email,
        check: PasswordResetCheck<'_>,
    ) -> AuthResult<User> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email_normalized = $1 FOR UPDATE");
        let mut user = sqlx::query_as::<_, UserRow>(&sql)
            .bind(email.as_str())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AuthError::UserNotFound)?
            .into_user()?;

        let password = check(&user)?;
        user.apply_password_reset(password, Utc::now());

        sqlx::query(
            r#"
            UPDATE users SET
                password_hash = $2,
                reset_code = NULL,
                reset_code_expires_at = NULL,
                login_attempts = 0,
                last_failed_attempt_at = NULL,
                updated_at = $3
            WHERE user_id = $1
            "#,
        )
        .bind(user.user_id.as_uuid())
        .bind(user.password.as_ref().map(|p| p.as_phc_string()))
        .bind(user.updated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(user.user_id.as_uuid())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(user)
    }
}

async fn insert_user<'e, E>(executor: E, user: &User) -> Result<(), sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO users (
            user_id,
            email,
            first_name,
            last_name,
            password_hash,
            auth_provider,
            is_active,
            activation_code,
            activation_expiry,
            login_attempts,
            last_login,
            google_id,
            created_at,
            updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        "#,
    )
    .bind(user.user_id.as_uuid())
    .bind(user.email.as_str())
    .bind(user.first_name.as_str())
    .bind(user.last_name.as_str())
    .bind(user.password.as_ref().map(|p| p.as_phc_string()))
    .bind(user.auth_provider.as_str())
    .bind(user.is_active)
    .bind(user.activation_code.as_ref().map(|c| c.as_str()))
    .bind(user.activation_expiry)
    .bind(user.login_attempts)
    .bind(user.last_login)
    .bind(&user.google_id)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(executor)
    .await?;

    Ok(())
}

// ============================================================================
// Auth Session Repository Implementation
// ============================================================================

impl AuthSessionRepository for PgAuthRepository {
    async fn create(&self, session: &AuthSession) -> AuthResult<()> {
        sqlx::query(
            r#"
            INSERT INTO auth_sessions (
                session_id,
                user_id,
                data,
                expires_at_ms,
                created_at,
                last_activity_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(session.session_id)
        .bind(session.user_id.map(UserId::into_uuid))
        .bind(Json(&session.data))
        .bind(session.expires_at_ms)
        .bind(session.created_at)
        .bind(session.last_activity_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, session_id: Uuid) -> AuthResult<Option<AuthSession>> {
        let row = sqlx::query_as::<_, AuthSessionRow>(
            r#"
            SELECT
                session_id,
                user_id,
                data,
                expires_at_ms,
                created_at,
                last_activity_at
            FROM auth_sessions
            WHERE session_id = $1
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(AuthSessionRow::into_session))
    }

    async fn update(&self, session: &AuthSession) -> AuthResult<()> {
        sqlx::query(
            r#"
            UPDATE auth_sessions SET
                user_id = $2,
                data = $3,
                expires_at_ms = $4,
                last_activity_at = $5
            WHERE session_id = $1
            "#,
        )
        .bind(session.session_id)
        .bind(session.user_id.map(UserId::into_uuid))
        .bind(Json(&session.data))
        .bind(session.expires_at_ms)
        .bind(session.last_activity_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, session_id: Uuid) -> AuthResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE session_id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_all_for_user(&self, user_id: &UserId) -> AuthResult<u64> {
        let deleted = sqlx::query("DELETE FROM auth_sessions WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted)
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        self.delete_expired_sessions().await
    }
}

// ============================================================================
// Refresh Token Repository Implementation
// ============================================================================

impl RefreshTokenRepository for PgAuthRepository {
    async fn insert(&self, record: &RefreshTokenRecord) -> AuthResult<()> {
        sqlx::query(
            "INSERT INTO refresh_tokens (token, user_id, expires_at, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(&record.token)
        .bind(record.user_id.as_uuid())
        .bind(record.expires_at)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn rotate(
        &self,
        old_token: &str,
        next: &RefreshTokenRecord,
        now: DateTime<Utc>,
    ) -> AuthResult<bool> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query(
            "DELETE FROM refresh_tokens WHERE token = $1 AND user_id = $2 AND expires_at > $3",
        )
        .bind(old_token)
        .bind(next.user_id.as_uuid())
        .bind(now)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if deleted == 0 {
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO refresh_tokens (token, user_id, expires_at, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(&next.token)
        .bind(next.user_id.as_uuid())
        .bind(next.expires_at)
        .bind(next.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(true)
    }

    async fn revoke(&self, token: &str) -> AuthResult<()> {
        sqlx::query("DELETE FROM refresh_tokens WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn revoke_all_for_user(&self, user_id: &UserId) -> AuthResult<u64> {
        let deleted = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted)
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        self.delete_expired_refresh_tokens().await
    }
}

// ============================================================================
// Row Types for sqlx mapping
// ============================================================================

#[derive(sqlx::FromRow)]
struct UserRow {
    user_id: Uuid,
    email: String,
    first_name: String,
    last_name: String,
    password_hash: Option<String>,
    auth_provider: String,
    is_active: bool,
    activation_code: Option<String>,
    activation_expiry: Option<DateTime<Utc>>,
    reset_code: Option<String>,
    reset_code_expires_at: Option<DateTime<Utc>>,
    login_attempts: i32,
    last_login: Option<DateTime<Utc>>,
    last_failed_attempt_at: Option<DateTime<Utc>>,
    google_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> AuthResult<User> {
        let password = self
            .password_hash
            .map(UserPassword::from_phc_string)
            .transpose()
            .map_err(|e| AuthError::Internal(format!("Invalid password hash: {}", e)))?;

        Ok(User {
            user_id: UserId::from_uuid(self.user_id),
            email: Email::from_db(self.email),
            first_name: PersonName::from_db(self.first_name),
            last_name: PersonName::from_db(self.last_name),
            password,
            auth_provider: AuthProvider::from_db(&self.auth_provider)?,
            is_active: self.is_active,
            activation_code: self.activation_code.map(OneTimeCode::from_db),
            activation_expiry: self.activation_expiry,
            reset_code: self.reset_code.map(OneTimeCode::from_db),
            reset_code_expires_at: self.reset_code_expires_at,
            login_attempts: self.login_attempts,
            last_login: self.last_login,
            last_failed_attempt_at: self.last_failed_attempt_at,
            google_id: self.google_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AuthSessionRow {
    session_id: Uuid,
    user_id: Option<Uuid>,
    data: Json<SessionData>,
    expires_at_ms: i64,
    created_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
}

impl AuthSessionRow {
    fn into_session(self) -> AuthSession {
        AuthSession {
            session_id: self.session_id,
            user_id: self.user_id.map(UserId::from_uuid),
            data: self.data.0,
            expires_at_ms: self.expires_at_ms,
            created_at: self.created_at,
            last_activity_at: self.last_activity_at,
        }
    }
}
