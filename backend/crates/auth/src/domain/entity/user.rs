//! User Entity
//!
//! A login identity. Never hard-deleted; deactivation flips `is_active`.

use chrono::{DateTime, Utc};

use crate::domain::value_object::{
    email::Email, user_id::UserId, user_password::UserPassword, user_role::UserRole,
};

/// User entity
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    /// Unique, case-sensitive login key
    pub email: Email,
    /// Argon2id hash. Never serialized.
    pub password_hash: UserPassword,
    pub role: UserRole,
    /// Inactive users cannot log in, refresh or pass the access guard
    pub is_active: bool,
    /// Set after an admin issues a temporary password
    pub must_change_password: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new active user
    pub fn new(email: Email, password_hash: UserPassword, role: UserRole) -> Self {
        let now = Utc::now();

        Self {
            id: UserId::new(),
            email,
            password_hash,
            role,
            is_active: true,
            must_change_password: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the account may authenticate at all
    pub fn can_login(&self) -> bool {
        self.is_active
    }

    /// Replace the password hash. `must_change` records whether the new
    /// password is a temporary one.
    pub fn set_password(
        &mut self,
        password_hash: UserPassword,
        must_change: bool,
        now: DateTime<Utc>,
    ) {
        self.password_hash = password_hash;
        self.must_change_password = must_change;
        self.updated_at = now;
    }

    pub fn set_role(&mut self, role: UserRole, now: DateTime<Utc>) {
        self.role = role;
        self.updated_at = now;
    }

    pub fn set_active(&mut self, is_active: bool, now: DateTime<Utc>) {
        self.is_active = is_active;
        self.updated_at = now;
    }
}
