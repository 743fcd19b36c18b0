//! Token issuance
//!
//! Mints a matched access/refresh pair and persists the refresh token's hash.

use std::sync::Arc;

use crate::application::token_codec::TokenCodec;
use crate::domain::entity::{refresh_token::RefreshToken, user::User};
use crate::domain::repository::RefreshTokenRepository;
use crate::domain::value_object::{token_hash::TokenHash, token_kind::TokenKind};
use crate::error::AuthResult;

/// Tokens handed to the client
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: u64,
}

pub struct TokenIssuer<T>
where
    T: RefreshTokenRepository,
{
    token_repo: Arc<T>,
    codec: Arc<TokenCodec>,
}

impl<T> TokenIssuer<T>
where
    T: RefreshTokenRepository,
{
    pub fn new(token_repo: Arc<T>, codec: Arc<TokenCodec>) -> Self {
        Self { token_repo, codec }
    }

    pub async fn issue(&self, user: &User) -> AuthResult<IssuedTokens> {
        let access = self.codec.sign(user, TokenKind::Access)?;
        let refresh = self.codec.sign(user, TokenKind::Refresh)?;

        let record = RefreshToken::new(
            user.id,
            TokenHash::of(&refresh.token),
            refresh.expires_at()?,
        );
        self.token_repo.persist(&record).await?;

        tracing::debug!(user_id = %user.id, refresh_token_id = %record.id, "Issued token pair");

        Ok(IssuedTokens {
            access_token: access.token,
            refresh_token: refresh.token,
            expires_in: self.codec.ttl(TokenKind::Access).as_secs(),
        })
    }
}
