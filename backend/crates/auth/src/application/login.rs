//! Login Use Case
//!
//! Verifies credentials and issues a token pair.

use std::sync::Arc;

use chrono::Utc;
use platform::password::PasswordHasher;

use crate::application::token_codec::TokenCodec;
use crate::application::tokens::{IssuedTokens, TokenIssuer};
use crate::domain::entity::user::User;
use crate::domain::repository::{RefreshTokenRepository, UserRepository};
use crate::domain::value_object::{
    email::Email,
    user_password::{RawPassword, UserPassword},
};
use crate::error::{AuthError, AuthResult};

pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Tokens plus the authenticated user
#[derive(Debug)]
pub struct AuthOutcome {
    pub tokens: IssuedTokens,
    pub user: User,
}

pub struct LoginUseCase<U, T>
where
    U: UserRepository,
    T: RefreshTokenRepository,
{
    user_repo: Arc<U>,
    issuer: TokenIssuer<T>,
    hasher: Arc<PasswordHasher>,
}

impl<U, T> LoginUseCase<U, T>
where
    U: UserRepository,
    T: RefreshTokenRepository,
{
    pub fn new(
        user_repo: Arc<U>,
        token_repo: Arc<T>,
        codec: Arc<TokenCodec>,
        hasher: Arc<PasswordHasher>,
    ) -> Self {
        Self {
            user_repo,
            issuer: TokenIssuer::new(token_repo, codec),
            hasher,
        }
    }

    /// Unknown email, wrong password and inactive account all fail with the
    /// same `InvalidCredentials`.
    pub async fn execute(&self, input: LoginInput) -> AuthResult<AuthOutcome> {
        let candidate = RawPassword::candidate(input.password);

        let user = match Email::new(&input.email) {
            Ok(email) => self.user_repo.find_by_email(&email).await?,
            Err(_) => None,
        };

        let Some(mut user) = user else {
            // Spend the same hashing time as a real verification
            let _ = UserPassword::from_raw(&candidate, &self.hasher);
            tracing::warn!(reason = "unknown_email", "Login failed");
            return Err(AuthError::InvalidCredentials);
        };

        if !user.password_hash.verify(&candidate, &self.hasher) {
            tracing::warn!(user_id = %user.id, reason = "wrong_password", "Login failed");
            return Err(AuthError::InvalidCredentials);
        }

        if !user.can_login() {
            tracing::warn!(user_id = %user.id, reason = "inactive", "Login failed");
            return Err(AuthError::InvalidCredentials);
        }

        if user.password_hash.needs_rehash(&self.hasher) {
            self.rehash(&mut user, &candidate).await;
        }

        let tokens = self.issuer.issue(&user).await?;

        tracing::info!(user_id = %user.id, role = %user.role, "User logged in");

        Ok(AuthOutcome { tokens, user })
    }

    /// Best-effort upgrade of an outdated hash. Skipped if the password
    /// changed since `user` was read.
    async fn rehash(&self, user: &mut User, candidate: &RawPassword) {
        let upgraded = match UserPassword::from_raw(candidate, &self.hasher) {
            Ok(hash) => hash,
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "Password rehash failed");
                return;
            }
        };

        let now = Utc::now();
        match self
            .user_repo
            .upgrade_password_hash(&user.id, &user.password_hash, &upgraded, now)
            .await
        {
            Ok(true) => {
                let must_change = user.must_change_password;
                user.set_password(upgraded, must_change, now);
                tracing::info!(user_id = %user.id, "Password hash upgraded");
            }
            Ok(false) => {
                tracing::debug!(user_id = %user.id, "Password changed concurrently, rehash skipped");
            }
            Err(e) => tracing::warn!(user_id = %user.id, error = %e, "Password rehash not saved"),
        }
    }
}
