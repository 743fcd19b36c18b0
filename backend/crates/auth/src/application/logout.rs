//! Logout Use Case
//!
//! Never fails the caller. Every failure is logged and swallowed.

use std::sync::Arc;

use chrono::Utc;

use crate::application::token_codec::TokenCodec;
use crate::domain::repository::RefreshTokenRepository;
use crate::domain::value_object::{token_hash::TokenHash, token_kind::TokenKind};

pub struct LogoutUseCase<T>
where
    T: RefreshTokenRepository,
{
    token_repo: Arc<T>,
    codec: Arc<TokenCodec>,
}

impl<T> LogoutUseCase<T>
where
    T: RefreshTokenRepository,
{
    pub fn new(token_repo: Arc<T>, codec: Arc<TokenCodec>) -> Self {
        Self { token_repo, codec }
    }

    /// Returns how many rows were revoked (zero on any failure)
    pub async fn execute(&self, raw_refresh_token: &str) -> u64 {
        let claims = match self.codec.verify(raw_refresh_token, TokenKind::Refresh) {
            Ok(claims) => claims,
            Err(_) => {
                tracing::debug!("Logout with unverifiable token, nothing to revoke");
                return 0;
            }
        };

        let hash = TokenHash::of(raw_refresh_token);

        match self
            .token_repo
            .revoke_matching(&claims.sub, &hash, Utc::now())
            .await
        {
            Ok(revoked) => {
                tracing::info!(user_id = %claims.sub, revoked, "User logged out");
                revoked
            }
            Err(e) => {
                tracing::warn!(user_id = %claims.sub, error = %e, "Logout revocation failed");
                0
            }
        }
    }
}
