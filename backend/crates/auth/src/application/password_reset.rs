//! Password Reset Use Case
//!
//! `request_reset` never reveals whether an account exists. A reset token is
//! an opaque random string; only its hash is stored and it works once.
//! Completing a reset revokes every refresh token of the user.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use platform::password::PasswordHasher;

use crate::domain::entity::password_reset_token::PasswordResetToken;
use crate::domain::repository::{
    PasswordResetRepository, RefreshTokenRepository, UserRepository,
};
use crate::domain::value_object::{
    email::Email,
    token_hash::TokenHash,
    user_id::UserId,
    user_password::{RawPassword, UserPassword},
};
use crate::error::{AuthError, AuthResult};

/// Raw reset token length in random bytes
const RESET_TOKEN_BYTES: usize = 32;

/// A reset token ready to be sent to its owner
pub struct ResetTicket {
    pub user_id: UserId,
    pub email: Email,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for ResetTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResetTicket")
            .field("user_id", &self.user_id)
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Out-of-band channel for reset tokens (mail, queue, ...)
pub trait ResetDelivery: Send + Sync {
    fn deliver(&self, ticket: &ResetTicket);
}

/// Records that a ticket was issued. The token itself is never logged.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogResetDelivery;

impl ResetDelivery for LogResetDelivery {
    fn deliver(&self, ticket: &ResetTicket) {
        tracing::info!(
            user_id = %ticket.user_id,
            expires_at = %ticket.expires_at,
            "Password reset token issued, no delivery channel configured"
        );
    }
}

pub struct PasswordResetUseCase<U, T, P>
where
    U: UserRepository,
    T: RefreshTokenRepository,
    P: PasswordResetRepository,
{
    user_repo: Arc<U>,
    token_repo: Arc<T>,
    reset_repo: Arc<P>,
    hasher: Arc<PasswordHasher>,
    ttl: Duration,
}

impl<U, T, P> PasswordResetUseCase<U, T, P>
where
    U: UserRepository,
    T: RefreshTokenRepository,
    P: PasswordResetRepository,
{
    pub fn new(
        user_repo: Arc<U>,
        token_repo: Arc<T>,
        reset_repo: Arc<P>,
        hasher: Arc<PasswordHasher>,
        ttl: Duration,
    ) -> Self {
        Self {
            user_repo,
            token_repo,
            reset_repo,
            hasher,
            ttl,
        }
    }

    /// `Some` only for an existing active account. Errors are logged, never returned.
    pub async fn request_reset(&self, email: &str) -> Option<ResetTicket> {
        match self.try_request_reset(email).await {
            Ok(ticket) => ticket,
            Err(e) => {
                tracing::error!(error = %e, "Password reset request failed");
                None
            }
        }
    }

    async fn try_request_reset(&self, email: &str) -> AuthResult<Option<ResetTicket>> {
        let Ok(email) = Email::new(email) else {
            tracing::debug!("Password reset requested for malformed email");
            return Ok(None);
        };

        let user = self
            .user_repo
            .find_by_email(&email)
            .await?
            .filter(|u| u.can_login());

        let Some(user) = user else {
            tracing::info!("Password reset requested for unknown or inactive account");
            return Ok(None);
        };

        let ttl = chrono::Duration::from_std(self.ttl)
            .map_err(|e| AuthError::Internal(format!("Reset TTL out of range: {}", e)))?;
        let expires_at = Utc::now() + ttl;

        let token = platform::crypto::random_token(RESET_TOKEN_BYTES);
        let record = PasswordResetToken::new(user.id, TokenHash::of(&token), expires_at);
        self.reset_repo.save_reset_token(&record).await?;

        tracing::info!(user_id = %user.id, expires_at = %expires_at, "Password reset requested");

        Ok(Some(ResetTicket {
            user_id: user.id,
            email: user.email,
            token,
            expires_at,
        }))
    }

    /// Fails with `InvalidToken` for an unknown, used or expired token
    pub async fn reset_password(&self, token: &str, new_password: String) -> AuthResult<()> {
        // Validate first so a rejected password does not burn the token
        let raw = RawPassword::new(new_password)?;
        let now = Utc::now();

        let Some(record) = self
            .reset_repo
            .consume_reset_token(&TokenHash::of(token), now)
            .await?
        else {
            tracing::warn!("Password reset with invalid, used or expired token");
            return Err(AuthError::InvalidToken);
        };

        let password_hash = UserPassword::from_raw(&raw, &self.hasher)?;
        let user = match self
            .user_repo
            .set_password(&record.user_id, &password_hash, false, now)
            .await
        {
            Ok(user) => user,
            Err(AuthError::UserNotFound) => {
                tracing::warn!(user_id = %record.user_id, "Password reset for missing user");
                return Err(AuthError::InvalidToken);
            }
            Err(e) => return Err(e),
        };

        let revoked = self.token_repo.revoke_all_for_user(&user.id, now).await?;

        tracing::info!(user_id = %user.id, revoked, "Password reset completed");

        Ok(())
    }
}
