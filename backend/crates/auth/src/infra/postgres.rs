//! PostgreSQL Repository Implementations

use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::domain::entity::{
    password_reset_token::{PasswordResetToken, PasswordResetTokenId},
    refresh_token::{RefreshToken, RefreshTokenId},
    user::User,
};
use crate::domain::repository::{PasswordResetRepository, RefreshTokenRepository, UserRepository};
use crate::domain::value_object::{
    email::Email, token_hash::TokenHash, user_id::UserId, user_password::UserPassword,
    user_role::UserRole,
};
use crate::error::{AuthError, AuthResult};

/// Advisory lock key serializing bootstrap-admin creation
const BOOTSTRAP_LOCK_KEY: i64 = 0x6175_7468_626f_6f74; // "authboot"

const USER_COLUMNS: &str = "id, email, password_hash, role, is_active, must_change_password, created_at, updated_at";

const REFRESH_COLUMNS: &str = "id, user_id, token_hash, expires_at, revoked_at, created_at";

const RESET_COLUMNS: &str = "id, user_id, token_hash, expires_at, used_at, created_at";

/// PostgreSQL-backed auth repository
#[derive(Clone)]
pub struct PgAuthRepository {
    pool: PgPool,
}

impl PgAuthRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Delete expired refresh and reset tokens
    pub async fn cleanup_expired(&self) -> AuthResult<u64> {
        let now = Utc::now();
        let refresh = self.delete_expired_refresh_tokens(now).await?;
        let reset = self.delete_expired_reset_tokens(now).await?;

        tracing::info!(
            refresh_tokens_deleted = refresh,
            reset_tokens_deleted = reset,
            "Cleaned up expired tokens"
        );

        Ok(refresh + reset)
    }
}

async fn insert_user<'e, E>(executor: E, user: &User) -> AuthResult<()>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO users (
            id,
            email,
            password_hash,
            role,
            is_active,
            must_change_password,
            created_at,
            updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(user.id.as_uuid())
    .bind(user.email.as_str())
    .bind(user.password_hash.as_phc_string())
    .bind(user.role.id())
    .bind(user.is_active)
    .bind(user.must_change_password)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(executor)
    .await
    .map_err(email_conflict)?;

    Ok(())
}

/// Unique violation on `users.email` becomes `EmailTaken`
fn email_conflict(err: sqlx::Error) -> AuthError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => AuthError::EmailTaken,
        _ => AuthError::Database(err),
    }
}

// ============================================================================
// User Repository Implementation
// ============================================================================

impl UserRepository for PgAuthRepository {
    async fn count(&self) -> AuthResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn create_bootstrap_admin(&self, user: &User) -> AuthResult<bool> {
        let mut tx = self.pool.begin().await?;

        // Released at commit/rollback
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(BOOTSTRAP_LOCK_KEY)
            .execute(&mut *tx)
            .await?;

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users)")
            .fetch_one(&mut *tx)
            .await?;

        if exists {
            tx.rollback().await?;
            return Ok(false);
        }

        insert_user(&mut *tx, user).await?;
        tx.commit().await?;

        Ok(true)
    }

    async fn create(&self, user: &User) -> AuthResult<()> {
        insert_user(&self.pool, user).await
    }

    async fn find_by_id(&self, user_id: &UserId) -> AuthResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_user).transpose()
    }

    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_user).transpose()
    }

    async fn exists_by_email(&self, email: &Email) -> AuthResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)",
        )
        .bind(email.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn list(&self) -> AuthResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(UserRow::into_user).collect()
    }

    async fn set_password(
        &self,
        user_id: &UserId,
        password_hash: &UserPassword,
        must_change_password: bool,
        now: DateTime<Utc>,
    ) -> AuthResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users SET
                password_hash = $2,
                must_change_password = $3,
                updated_at = $4
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user_id.as_uuid())
        .bind(password_hash.as_phc_string())
        .bind(must_change_password)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(AuthError::UserNotFound)?.into_user()
    }

    async fn upgrade_password_hash(
        &self,
        user_id: &UserId,
        current: &UserPassword,
        upgraded: &UserPassword,
        now: DateTime<Utc>,
    ) -> AuthResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                password_hash = $3,
                updated_at = $4
            WHERE id = $1 AND password_hash = $2
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(current.as_phc_string())
        .bind(upgraded.as_phc_string())
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn set_role_and_active(
        &self,
        user_id: &UserId,
        role: Option<UserRole>,
        is_active: Option<bool>,
        now: DateTime<Utc>,
    ) -> AuthResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users SET
                role = COALESCE($2, role),
                is_active = COALESCE($3, is_active),
                updated_at = $4
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user_id.as_uuid())
        .bind(role.map(|r| r.id()))
        .bind(is_active)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(AuthError::UserNotFound)?.into_user()
    }
}

// ============================================================================
// Refresh Token Repository Implementation
// ============================================================================

impl RefreshTokenRepository for PgAuthRepository {
    async fn persist(&self, token: &RefreshToken) -> AuthResult<()> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (
                id,
                user_id,
                token_hash,
                expires_at,
                revoked_at,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(token.id.as_uuid())
        .bind(token.user_id.as_uuid())
        .bind(token.token_hash.as_str())
        .bind(token.expires_at)
        .bind(token.revoked_at)
        .bind(token.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_active(
        &self,
        user_id: &UserId,
        token_hash: &TokenHash,
        now: DateTime<Utc>,
    ) -> AuthResult<Option<RefreshToken>> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(&format!(
            r#"
            SELECT {REFRESH_COLUMNS}
            FROM refresh_tokens
            WHERE user_id = $1
              AND token_hash = $2
              AND revoked_at IS NULL
              AND expires_at > $3
            LIMIT 1
            "#
        ))
        .bind(user_id.as_uuid())
        .bind(token_hash.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(RefreshTokenRow::into_token))
    }

    async fn revoke(&self, id: &RefreshTokenId, now: DateTime<Utc>) -> AuthResult<()> {
        sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = $2 WHERE id = $1 AND revoked_at IS NULL",
        )
        .bind(id.as_uuid())
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn revoke_matching(
        &self,
        user_id: &UserId,
        token_hash: &TokenHash,
        now: DateTime<Utc>,
    ) -> AuthResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens SET revoked_at = $3
            WHERE user_id = $1
              AND token_hash = $2
              AND revoked_at IS NULL
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(token_hash.as_str())
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn consume_active(
        &self,
        user_id: &UserId,
        token_hash: &TokenHash,
        now: DateTime<Utc>,
    ) -> AuthResult<Option<RefreshToken>> {
        // Concurrent callers block on the row lock; after the winner commits
        // the predicate no longer holds and the loser updates zero rows.
        let row = sqlx::query_as::<_, RefreshTokenRow>(&format!(
            r#"
            UPDATE refresh_tokens SET revoked_at = $3
            WHERE user_id = $1
              AND token_hash = $2
              AND revoked_at IS NULL
              AND expires_at > $3
            RETURNING {REFRESH_COLUMNS}
            "#
        ))
        .bind(user_id.as_uuid())
        .bind(token_hash.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(RefreshTokenRow::into_token))
    }

    async fn revoke_all_for_user(&self, user_id: &UserId, now: DateTime<Utc>) -> AuthResult<u64> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = $2 WHERE user_id = $1 AND revoked_at IS NULL",
        )
        .bind(user_id.as_uuid())
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete_expired_refresh_tokens(&self, now: DateTime<Utc>) -> AuthResult<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

// ============================================================================
// Password Reset Repository Implementation
// ============================================================================

impl PasswordResetRepository for PgAuthRepository {
    async fn save_reset_token(&self, token: &PasswordResetToken) -> AuthResult<()> {
        sqlx::query(
            r#"
            INSERT INTO password_reset_tokens (
                id,
                user_id,
                token_hash,
                expires_at,
                used_at,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(token.id.as_uuid())
        .bind(token.user_id.as_uuid())
        .bind(token.token_hash.as_str())
        .bind(token.expires_at)
        .bind(token.used_at)
        .bind(token.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn consume_reset_token(
        &self,
        token_hash: &TokenHash,
        now: DateTime<Utc>,
    ) -> AuthResult<Option<PasswordResetToken>> {
        let row = sqlx::query_as::<_, PasswordResetRow>(&format!(
            r#"
            UPDATE password_reset_tokens SET used_at = $2
            WHERE token_hash = $1
              AND used_at IS NULL
              AND expires_at > $2
            RETURNING {RESET_COLUMNS}
            "#
        ))
        .bind(token_hash.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(PasswordResetRow::into_token))
    }

    async fn delete_expired_reset_tokens(&self, now: DateTime<Utc>) -> AuthResult<u64> {
        let result = sqlx::query("DELETE FROM password_reset_tokens WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

// ============================================================================
// Row Types for sqlx mapping
// ============================================================================

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    role: i16,
    is_active: bool,
    must_change_password: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> AuthResult<User> {
        let role = UserRole::from_id(self.role)
            .ok_or_else(|| AuthError::Internal(format!("Invalid role id: {}", self.role)))?;

        Ok(User {
            id: UserId::from_uuid(self.id),
            email: Email::from_db(self.email),
            password_hash: UserPassword::from_phc_string(self.password_hash)?,
            role,
            is_active: self.is_active,
            must_change_password: self.must_change_password,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RefreshTokenRow {
    id: Uuid,
    user_id: Uuid,
    token_hash: String,
    expires_at: DateTime<Utc>,
    revoked_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl RefreshTokenRow {
    fn into_token(self) -> RefreshToken {
        RefreshToken {
            id: RefreshTokenId::from_uuid(self.id),
            user_id: UserId::from_uuid(self.user_id),
            token_hash: TokenHash::from_db(self.token_hash),
            expires_at: self.expires_at,
            revoked_at: self.revoked_at,
            created_at: self.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PasswordResetRow {
    id: Uuid,
    user_id: Uuid,
    token_hash: String,
    expires_at: DateTime<Utc>,
    used_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl PasswordResetRow {
    fn into_token(self) -> PasswordResetToken {
        PasswordResetToken {
            id: PasswordResetTokenId::from_uuid(self.id),
            user_id: UserId::from_uuid(self.user_id),
            token_hash: TokenHash::from_db(self.token_hash),
            expires_at: self.expires_at,
            used_at: self.used_at,
            created_at: self.created_at,
        }
    }
}
