//! Refresh Token Entity
//!
//! Persisted record of an issued refresh token, keyed by its hash.
//! Only `revoked_at` ever changes, and only from `None` to `Some`.

use chrono::{DateTime, Utc};
use kernel::id::Id;

use crate::domain::value_object::{token_hash::TokenHash, user_id::UserId};

pub struct RefreshTokenMarker;
pub type RefreshTokenId = Id<RefreshTokenMarker>;

/// Lifecycle of a refresh token row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTokenState {
    Active,
    Revoked,
    Expired,
}

#[derive(Debug, Clone)]
pub struct RefreshToken {
    pub id: RefreshTokenId,
    pub user_id: UserId,
    pub token_hash: TokenHash,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl RefreshToken {
    pub fn new(user_id: UserId, token_hash: TokenHash, expires_at: DateTime<Utc>) -> Self {
        Self {
            id: RefreshTokenId::new(),
            user_id,
            token_hash,
            expires_at,
            revoked_at: None,
            created_at: Utc::now(),
        }
    }

    /// Revoked and expired are both terminal; revocation wins when both hold.
    pub fn state(&self, now: DateTime<Utc>) -> RefreshTokenState {
        if self.revoked_at.is_some() {
            RefreshTokenState::Revoked
        } else if self.expires_at <= now {
            RefreshTokenState::Expired
        } else {
            RefreshTokenState::Active
        }
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.state(now) == RefreshTokenState::Active
    }

    /// Idempotent: the first revocation instant is kept
    pub fn revoke(&mut self, now: DateTime<Utc>) {
        if self.revoked_at.is_none() {
            self.revoked_at = Some(now);
        }
    }
}
