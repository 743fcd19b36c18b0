//! Register Use Case
//!
//! The first user of an empty directory becomes ADMIN without a caller.
//! Every later registration requires an authenticated ADMIN.

use std::sync::Arc;

use platform::password::PasswordHasher;

use crate::application::login::AuthOutcome;
use crate::application::token_codec::TokenCodec;
use crate::application::tokens::TokenIssuer;
use crate::domain::entity::user::User;
use crate::domain::repository::{RefreshTokenRepository, UserRepository};
use crate::domain::value_object::{
    email::Email,
    user_password::{RawPassword, UserPassword},
    user_role::UserRole,
};
use crate::error::{AuthError, AuthResult};

pub struct RegisterInput {
    pub email: String,
    pub password: String,
    /// Defaults to USER; ignored for the bootstrap admin
    pub role: Option<UserRole>,
}

pub struct RegisterUseCase<U, T>
where
    U: UserRepository,
    T: RefreshTokenRepository,
{
    user_repo: Arc<U>,
    issuer: TokenIssuer<T>,
    hasher: Arc<PasswordHasher>,
}

impl<U, T> RegisterUseCase<U, T>
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

    pub async fn execute(
        &self,
        input: RegisterInput,
        requester: Option<&User>,
    ) -> AuthResult<AuthOutcome> {
        let email = Email::new(&input.email)?;
        let raw = RawPassword::new(input.password)?;

        if self.user_repo.count().await? == 0 {
            let password_hash = UserPassword::from_raw(&raw, &self.hasher)?;
            let admin = User::new(email.clone(), password_hash, UserRole::Admin);

            if self.user_repo.create_bootstrap_admin(&admin).await? {
                tracing::info!(user_id = %admin.id, "Bootstrap admin created");
                return self.sign_in(admin).await;
            }

            tracing::debug!("Directory no longer empty, falling back to admin-gated registration");
        }

        match requester {
            Some(caller) if caller.role.is_admin() => {}
            Some(caller) => {
                return Err(AuthError::forbidden(format!(
                    "Only ADMIN can register users (caller role: {})",
                    caller.role
                )));
            }
            None => {
                return Err(AuthError::forbidden(
                    "Registration requires an authenticated ADMIN",
                ));
            }
        }

        if self.user_repo.exists_by_email(&email).await? {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = UserPassword::from_raw(&raw, &self.hasher)?;
        let user = User::new(email, password_hash, input.role.unwrap_or_default());
        self.user_repo.create(&user).await?;

        tracing::info!(
            user_id = %user.id,
            role = %user.role,
            created_by = ?requester.map(|u| u.id),
            "User registered"
        );

        self.sign_in(user).await
    }

    async fn sign_in(&self, user: User) -> AuthResult<AuthOutcome> {
        let tokens = self.issuer.issue(&user).await?;
        Ok(AuthOutcome { tokens, user })
    }
}
