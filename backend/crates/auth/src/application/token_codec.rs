//! Token Codec
//!
//! HS256 JWTs for two purposes. Access and refresh tokens are signed with
//! distinct secrets, and the `type` claim must match the verification context.

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::config::{AuthConfig, TokenSettings};
use crate::domain::entity::user::User;
use crate::domain::value_object::{
    email::Email, token_kind::TokenKind, user_id::UserId, user_role::UserRole,
};
use crate::error::{AuthError, AuthResult};

/// Claims carried by every token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: UserId,
    pub email: Email,
    pub role: UserRole,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    pub iat: u64,
    pub exp: u64,
    /// Unique per token, so two tokens minted in the same second differ
    pub jti: Uuid,
}

/// A freshly signed token and the claims inside it
#[derive(Debug, Clone)]
pub struct SignedToken {
    pub token: String,
    pub claims: TokenClaims,
}

impl SignedToken {
    pub fn expires_at(&self) -> AuthResult<DateTime<Utc>> {
        i64::try_from(self.claims.exp)
            .ok()
            .and_then(|exp| DateTime::from_timestamp(exp, 0))
            .ok_or_else(|| AuthError::Internal("Token expiry out of range".to_string()))
    }
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl Keys {
    fn new(settings: &TokenSettings) -> Self {
        Self {
            encoding: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding: DecodingKey::from_secret(settings.secret.as_bytes()),
            ttl: settings.ttl,
        }
    }
}

pub struct TokenCodec {
    access: Keys,
    refresh: Keys,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(access: &TokenSettings, refresh: &TokenSettings) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            access: Keys::new(access),
            refresh: Keys::new(refresh),
            validation,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(&config.access, &config.refresh)
    }

    fn keys(&self, kind: TokenKind) -> &Keys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    pub fn ttl(&self, kind: TokenKind) -> Duration {
        self.keys(kind).ttl
    }

    pub fn sign(&self, user: &User, kind: TokenKind) -> AuthResult<SignedToken> {
        self.sign_at(user, kind, Utc::now())
    }

    /// Sign as if issued at `issued_at`
    pub fn sign_at(
        &self,
        user: &User,
        kind: TokenKind,
        issued_at: DateTime<Utc>,
    ) -> AuthResult<SignedToken> {
        let keys = self.keys(kind);
        let iat = u64::try_from(issued_at.timestamp())
            .map_err(|_| AuthError::Internal("Issue time before epoch".to_string()))?;

        let claims = TokenClaims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            kind,
            iat,
            exp: iat.saturating_add(keys.ttl.as_secs()),
            jti: Uuid::new_v4(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
            .map_err(|e| AuthError::Internal(format!("Failed to sign {} token: {}", kind, e)))?;

        Ok(SignedToken { token, claims })
    }

    /// Fails with `InvalidToken` on a bad signature, expiry, or kind mismatch
    pub fn verify(&self, token: &str, kind: TokenKind) -> AuthResult<TokenClaims> {
        let data = decode::<TokenClaims>(token, &self.keys(kind).decoding, &self.validation)
            .map_err(|e| {
                tracing::debug!(kind = %kind, error = %e, "Token rejected");
                AuthError::InvalidToken
            })?;

        if data.claims.kind != kind {
            tracing::warn!(
                expected = %kind,
                presented = %data.claims.kind,
                user_id = %data.claims.sub,
                "Token kind mismatch"
            );
            return Err(AuthError::InvalidToken);
        }

        Ok(data.claims)
    }
}
