//! Current User Use Case
//!
//! Resolves the subject of a verified access token.

use std::sync::Arc;

use crate::domain::entity::user::User;
use crate::domain::repository::UserRepository;
use crate::domain::value_object::user_id::UserId;
use crate::error::{AuthError, AuthResult};

pub struct CurrentUserUseCase<U>
where
    U: UserRepository,
{
    user_repo: Arc<U>,
}

impl<U> CurrentUserUseCase<U>
where
    U: UserRepository,
{
    pub fn new(user_repo: Arc<U>) -> Self {
        Self { user_repo }
    }

    /// Deleted and deactivated users both fail with `InvalidToken`
    pub async fn execute(&self, user_id: &UserId) -> AuthResult<User> {
        match self.user_repo.find_by_id(user_id).await? {
            Some(user) if user.can_login() => Ok(user),
            Some(_) => {
                tracing::debug!(user_id = %user_id, "Token subject is inactive");
                Err(AuthError::InvalidToken)
            }
            None => {
                tracing::debug!(user_id = %user_id, "Token subject no longer exists");
                Err(AuthError::InvalidToken)
            }
        }
    }
}
