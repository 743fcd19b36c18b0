//! Refresh Use Case
//!
//! Rotation: the presented refresh token is consumed in one atomic store
//! operation before a new pair is minted, so one token yields at most one
//! successful refresh.

use std::sync::Arc;

use chrono::Utc;

use crate::application::login::AuthOutcome;
use crate::application::token_codec::TokenCodec;
use crate::application::tokens::TokenIssuer;
use crate::domain::repository::{RefreshTokenRepository, UserRepository};
use crate::domain::value_object::{token_hash::TokenHash, token_kind::TokenKind};
use crate::error::{AuthError, AuthResult};

pub struct RefreshUseCase<U, T>
where
    U: UserRepository,
    T: RefreshTokenRepository,
{
    user_repo: Arc<U>,
    token_repo: Arc<T>,
    codec: Arc<TokenCodec>,
    issuer: TokenIssuer<T>,
}

impl<U, T> RefreshUseCase<U, T>
where
    U: UserRepository,
    T: RefreshTokenRepository,
{
    pub fn new(user_repo: Arc<U>, token_repo: Arc<T>, codec: Arc<TokenCodec>) -> Self {
        Self {
            user_repo,
            issuer: TokenIssuer::new(token_repo.clone(), codec.clone()),
            token_repo,
            codec,
        }
    }

    pub async fn execute(&self, raw_refresh_token: &str) -> AuthResult<AuthOutcome> {
        let claims = self.codec.verify(raw_refresh_token, TokenKind::Refresh)?;
        let hash = TokenHash::of(raw_refresh_token);

        let consumed = self
            .token_repo
            .consume_active(&claims.sub, &hash, Utc::now())
            .await?;

        let Some(consumed) = consumed else {
            tracing::warn!(
                user_id = %claims.sub,
                jti = %claims.jti,
                "Refresh token replayed, revoked or expired"
            );
            return Err(AuthError::InvalidToken);
        };

        let user = self
            .user_repo
            .find_by_id(&claims.sub)
            .await?
            .filter(|u| u.can_login())
            .ok_or_else(|| {
                tracing::warn!(user_id = %claims.sub, "Refresh for missing or inactive user");
                AuthError::InvalidToken
            })?;

        let tokens = self.issuer.issue(&user).await?;

        tracing::info!(
            user_id = %user.id,
            rotated_from = %consumed.id,
            "Refresh token rotated"
        );

        Ok(AuthOutcome { tokens, user })
    }
}
