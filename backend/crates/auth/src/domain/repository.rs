//! Repository Traits
//!
//! Interfaces for data persistence. Implementations live in the infra layer.
//! Every operation that checks and mutates state in one step (bootstrap insert,
//! refresh rotation, reset consumption) is a single atomic store call.

use chrono::{DateTime, Utc};

use crate::domain::entity::{
    password_reset_token::PasswordResetToken,
    refresh_token::{RefreshToken, RefreshTokenId},
    user::User,
};
use crate::domain::value_object::{
    email::Email, token_hash::TokenHash, user_id::UserId, user_password::UserPassword,
    user_role::UserRole,
};
use crate::error::AuthResult;

/// User directory
#[trait_variant::make(UserRepository: Send)]
pub trait LocalUserRepository {
    /// Number of users ever created
    async fn count(&self) -> AuthResult<u64>;

    /// Insert `user` only if the directory is empty.
    /// Returns `false` when another user already exists (nothing written).
    async fn create_bootstrap_admin(&self, user: &User) -> AuthResult<bool>;

    /// Create a new user. Duplicate email fails with `EmailTaken`.
    async fn create(&self, user: &User) -> AuthResult<()>;

    async fn find_by_id(&self, user_id: &UserId) -> AuthResult<Option<User>>;

    /// Exact, case-sensitive match
    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<User>>;

    async fn exists_by_email(&self, email: &Email) -> AuthResult<bool>;

    /// All users, oldest first
    async fn list(&self) -> AuthResult<Vec<User>>;

    /// Replace the password hash and the must-change flag, leaving role and
    /// active flag untouched. Returns the stored user or `UserNotFound`.
    async fn set_password(
        &self,
        user_id: &UserId,
        password_hash: &UserPassword,
        must_change_password: bool,
        now: DateTime<Utc>,
    ) -> AuthResult<User>;

    /// Swap the hash only while it still equals `current`.
    /// Returns `false` when the password changed in the meantime.
    async fn upgrade_password_hash(
        &self,
        user_id: &UserId,
        current: &UserPassword,
        upgraded: &UserPassword,
        now: DateTime<Utc>,
    ) -> AuthResult<bool>;

    /// Change role and/or active flag. `None` keeps the stored value.
    /// Returns the stored user or `UserNotFound`.
    async fn set_role_and_active(
        &self,
        user_id: &UserId,
        role: Option<UserRole>,
        is_active: Option<bool>,
        now: DateTime<Utc>,
    ) -> AuthResult<User>;
}

/// Refresh token store
#[trait_variant::make(RefreshTokenRepository: Send)]
pub trait LocalRefreshTokenRepository {
    /// Insert a new active row
    async fn persist(&self, token: &RefreshToken) -> AuthResult<()>;

    /// Row matching `(user, hash)` that is neither revoked nor expired at `now`
    async fn find_active(
        &self,
        user_id: &UserId,
        token_hash: &TokenHash,
        now: DateTime<Utc>,
    ) -> AuthResult<Option<RefreshToken>>;

    /// Set `revoked_at = now`. Revoking an already revoked row is a no-op.
    async fn revoke(&self, id: &RefreshTokenId, now: DateTime<Utc>) -> AuthResult<()>;

    /// Revoke every active row matching `(user, hash)`. Returns rows revoked.
    async fn revoke_matching(
        &self,
        user_id: &UserId,
        token_hash: &TokenHash,
        now: DateTime<Utc>,
    ) -> AuthResult<u64>;

    /// Atomically revoke the active row matching `(user, hash)` and return it.
    /// `None` means absent, expired, or already consumed by a concurrent caller.
    async fn consume_active(
        &self,
        user_id: &UserId,
        token_hash: &TokenHash,
        now: DateTime<Utc>,
    ) -> AuthResult<Option<RefreshToken>>;

    /// Revoke every active row of a user. Returns rows revoked.
    async fn revoke_all_for_user(&self, user_id: &UserId, now: DateTime<Utc>) -> AuthResult<u64>;

    /// Delete rows expired before `now`
    async fn delete_expired_refresh_tokens(&self, now: DateTime<Utc>) -> AuthResult<u64>;
}

/// Password reset token store
#[trait_variant::make(PasswordResetRepository: Send)]
pub trait LocalPasswordResetRepository {
    async fn save_reset_token(&self, token: &PasswordResetToken) -> AuthResult<()>;

    /// Atomically mark the unused, unexpired token as used and return it
    async fn consume_reset_token(
        &self,
        token_hash: &TokenHash,
        now: DateTime<Utc>,
    ) -> AuthResult<Option<PasswordResetToken>>;

    /// Delete tokens expired before `now`
    async fn delete_expired_reset_tokens(&self, now: DateTime<Utc>) -> AuthResult<u64>;
}

/// Everything the auth service needs from persistence
pub trait AuthStore:
    UserRepository + RefreshTokenRepository + PasswordResetRepository + Clone + Send + Sync + 'static
{
}

impl<T> AuthStore for T where
    T: UserRepository
        + RefreshTokenRepository
        + PasswordResetRepository
        + Clone
        + Send
        + Sync
        + 'static
{
}
