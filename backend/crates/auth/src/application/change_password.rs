//! Change Password Use Case

use std::sync::Arc;

use chrono::Utc;
use platform::password::PasswordHasher;

use crate::domain::entity::user::User;
use crate::domain::repository::UserRepository;
use crate::domain::value_object::{
    user_id::UserId,
    user_password::{RawPassword, UserPassword},
};
use crate::error::{AuthError, AuthResult};

pub struct ChangePasswordInput {
    pub current_password: String,
    pub new_password: String,
}

pub struct ChangePasswordUseCase<U>
where
    U: UserRepository,
{
    user_repo: Arc<U>,
    hasher: Arc<PasswordHasher>,
}

impl<U> ChangePasswordUseCase<U>
where
    U: UserRepository,
{
    pub fn new(user_repo: Arc<U>, hasher: Arc<PasswordHasher>) -> Self {
        Self { user_repo, hasher }
    }

    /// Returns the updated user with `must_change_password` cleared
    pub async fn execute(&self, user_id: &UserId, input: ChangePasswordInput) -> AuthResult<User> {
        let new_password = RawPassword::new(input.new_password)?;
        let current = RawPassword::candidate(input.current_password);

        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if !user.password_hash.verify(&current, &self.hasher) {
            tracing::warn!(user_id = %user.id, "Password change with wrong current password");
            return Err(AuthError::InvalidCredentials);
        }

        let password_hash = UserPassword::from_raw(&new_password, &self.hasher)?;
        let updated = self
            .user_repo
            .set_password(&user.id, &password_hash, false, Utc::now())
            .await?;

        tracing::info!(user_id = %updated.id, "Password changed");

        Ok(updated)
    }
}
