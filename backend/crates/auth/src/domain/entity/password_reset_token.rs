//! Password Reset Token Entity
//!
//! Single-use, time-bound credential, unrelated to the access/refresh pair.

use chrono::{DateTime, Utc};
use kernel::id::Id;

use crate::domain::value_object::{token_hash::TokenHash, user_id::UserId};

pub struct PasswordResetTokenMarker;
pub type PasswordResetTokenId = Id<PasswordResetTokenMarker>;

#[derive(Debug, Clone)]
pub struct PasswordResetToken {
    pub id: PasswordResetTokenId,
    pub user_id: UserId,
    pub token_hash: TokenHash,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PasswordResetToken {
    pub fn new(user_id: UserId, token_hash: TokenHash, expires_at: DateTime<Utc>) -> Self {
        Self {
            id: PasswordResetTokenId::new(),
            user_id,
            token_hash,
            expires_at,
            used_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.used_at.is_none() && self.expires_at > now
    }
}
