//! Admin User Management
//!
//! Listing, role/activation changes and temporary passwords. Callers are
//! already authorized as ADMIN by the route policy.

use std::sync::Arc;

use chrono::Utc;
use platform::password::PasswordHasher;

use crate::domain::entity::user::User;
use crate::domain::repository::{RefreshTokenRepository, UserRepository};
use crate::domain::value_object::{
    user_id::UserId,
    user_password::{RawPassword, UserPassword},
    user_role::UserRole,
};
use crate::error::{AuthError, AuthResult};

/// Random bytes behind a temporary password (16 base64url characters)
const TEMPORARY_PASSWORD_BYTES: usize = 12;

#[derive(Debug, Default)]
pub struct UpdateUserInput {
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}

pub struct ManageUsersUseCase<U, T>
where
    U: UserRepository,
    T: RefreshTokenRepository,
{
    user_repo: Arc<U>,
    token_repo: Arc<T>,
    hasher: Arc<PasswordHasher>,
}

impl<U, T> ManageUsersUseCase<U, T>
where
    U: UserRepository,
    T: RefreshTokenRepository,
{
    pub fn new(user_repo: Arc<U>, token_repo: Arc<T>, hasher: Arc<PasswordHasher>) -> Self {
        Self {
            user_repo,
            token_repo,
            hasher,
        }
    }

    pub async fn list(&self) -> AuthResult<Vec<User>> {
        self.user_repo.list().await
    }

    pub async fn get(&self, user_id: &UserId) -> AuthResult<User> {
        self.user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Deactivation revokes the user's refresh tokens
    pub async fn update(
        &self,
        actor: &User,
        user_id: &UserId,
        input: UpdateUserInput,
    ) -> AuthResult<User> {
        if input.role.is_none() && input.is_active.is_none() {
            return Err(AuthError::validation("Nothing to update"));
        }

        if actor.id == *user_id {
            if input.role.is_some_and(|role| !role.is_admin()) {
                return Err(AuthError::forbidden("Administrators cannot demote themselves"));
            }
            if input.is_active == Some(false) {
                return Err(AuthError::forbidden("Administrators cannot deactivate themselves"));
            }
        }

        let now = Utc::now();
        let user = self
            .user_repo
            .set_role_and_active(user_id, input.role, input.is_active, now)
            .await?;

        if input.is_active == Some(false) {
            let revoked = self.token_repo.revoke_all_for_user(&user.id, now).await?;
            tracing::info!(user_id = %user.id, revoked, "Revoked sessions of deactivated user");
        }

        tracing::info!(
            user_id = %user.id,
            actor_id = %actor.id,
            role = %user.role,
            is_active = user.is_active,
            "User updated"
        );

        Ok(user)
    }

    /// Returns the user and the temporary password. The password is shown once.
    pub async fn issue_temporary_password(
        &self,
        actor: &User,
        user_id: &UserId,
    ) -> AuthResult<(User, String)> {
        let temporary = platform::crypto::random_token(TEMPORARY_PASSWORD_BYTES);
        let raw = RawPassword::new(temporary.clone())?;
        let password_hash = UserPassword::from_raw(&raw, &self.hasher)?;

        let now = Utc::now();
        let user = self
            .user_repo
            .set_password(user_id, &password_hash, true, now)
            .await?;

        let revoked = self.token_repo.revoke_all_for_user(&user.id, now).await?;

        tracing::info!(
            user_id = %user.id,
            actor_id = %actor.id,
            revoked,
            "Temporary password issued"
        );

        Ok((user, temporary))
    }
}
