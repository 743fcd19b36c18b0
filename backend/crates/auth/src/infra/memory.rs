//! In-Memory Repository
//!
//! Process-local store behind one async mutex. Each trait method runs under a
//! single lock acquisition, so check-then-act operations are atomic.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::entity::{
    password_reset_token::PasswordResetToken,
    refresh_token::{RefreshToken, RefreshTokenId},
    user::User,
};
use crate::domain::repository::{PasswordResetRepository, RefreshTokenRepository, UserRepository};
use crate::domain::value_object::{
    email::Email, token_hash::TokenHash, user_id::UserId, user_password::UserPassword,
    user_role::UserRole,
};
use crate::error::{AuthError, AuthResult};

#[derive(Default)]
struct State {
    /// Insertion order is creation order
    users: Vec<User>,
    refresh_tokens: Vec<RefreshToken>,
    reset_tokens: Vec<PasswordResetToken>,
}

impl State {
    fn insert_user(&mut self, user: &User) -> AuthResult<()> {
        if self.users.iter().any(|u| u.email == user.email) {
            return Err(AuthError::EmailTaken);
        }
        self.users.push(user.clone());
        Ok(())
    }

    fn user_mut(&mut self, user_id: &UserId) -> AuthResult<&mut User> {
        self.users
            .iter_mut()
            .find(|u| u.id == *user_id)
            .ok_or(AuthError::UserNotFound)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryAuthRepository {
    state: Arc<Mutex<State>>,
}

impl InMemoryAuthRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of active refresh tokens a user holds at `now`
    pub async fn active_refresh_tokens(&self, user_id: &UserId, now: DateTime<Utc>) -> usize {
        let state = self.state.lock().await;
        state
            .refresh_tokens
            .iter()
            .filter(|t| t.user_id == *user_id && t.is_active(now))
            .count()
    }
}

impl UserRepository for InMemoryAuthRepository {
    async fn count(&self) -> AuthResult<u64> {
        Ok(self.state.lock().await.users.len() as u64)
    }

    async fn create_bootstrap_admin(&self, user: &User) -> AuthResult<bool> {
        let mut state = self.state.lock().await;
        if !state.users.is_empty() {
            return Ok(false);
        }
        state.insert_user(user)?;
        Ok(true)
    }

    async fn create(&self, user: &User) -> AuthResult<()> {
        self.state.lock().await.insert_user(user)
    }

    async fn find_by_id(&self, user_id: &UserId) -> AuthResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state.users.iter().find(|u| u.id == *user_id).cloned())
    }

    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state.users.iter().find(|u| u.email == *email).cloned())
    }

    async fn exists_by_email(&self, email: &Email) -> AuthResult<bool> {
        let state = self.state.lock().await;
        Ok(state.users.iter().any(|u| u.email == *email))
    }

    async fn list(&self) -> AuthResult<Vec<User>> {
        Ok(self.state.lock().await.users.clone())
    }

    async fn set_password(
        &self,
        user_id: &UserId,
        password_hash: &UserPassword,
        must_change_password: bool,
        now: DateTime<Utc>,
    ) -> AuthResult<User> {
        let mut state = self.state.lock().await;
        let user = state.user_mut(user_id)?;
        user.set_password(password_hash.clone(), must_change_password, now);
        Ok(user.clone())
    }

    async fn upgrade_password_hash(
        &self,
        user_id: &UserId,
        current: &UserPassword,
        upgraded: &UserPassword,
        now: DateTime<Utc>,
    ) -> AuthResult<bool> {
        let mut state = self.state.lock().await;
        let user = state.user_mut(user_id)?;
        if user.password_hash != *current {
            return Ok(false);
        }
        let must_change = user.must_change_password;
        user.set_password(upgraded.clone(), must_change, now);
        Ok(true)
    }

    async fn set_role_and_active(
        &self,
        user_id: &UserId,
        role: Option<UserRole>,
        is_active: Option<bool>,
        now: DateTime<Utc>,
    ) -> AuthResult<User> {
        let mut state = self.state.lock().await;
        let user = state.user_mut(user_id)?;
        if let Some(role) = role {
            user.set_role(role, now);
        }
        if let Some(is_active) = is_active {
            user.set_active(is_active, now);
        }
        Ok(user.clone())
    }
}

impl RefreshTokenRepository for InMemoryAuthRepository {
    async fn persist(&self, token: &RefreshToken) -> AuthResult<()> {
        self.state.lock().await.refresh_tokens.push(token.clone());
        Ok(())
    }

    async fn find_active(
        &self,
        user_id: &UserId,
        token_hash: &TokenHash,
        now: DateTime<Utc>,
    ) -> AuthResult<Option<RefreshToken>> {
        let state = self.state.lock().await;
        Ok(state
            .refresh_tokens
            .iter()
            .find(|t| t.user_id == *user_id && t.token_hash == *token_hash && t.is_active(now))
            .cloned())
    }

    async fn revoke(&self, id: &RefreshTokenId, now: DateTime<Utc>) -> AuthResult<()> {
        let mut state = self.state.lock().await;
        if let Some(token) = state.refresh_tokens.iter_mut().find(|t| t.id == *id) {
            token.revoke(now);
        }
        Ok(())
    }

    async fn revoke_matching(
        &self,
        user_id: &UserId,
        token_hash: &TokenHash,
        now: DateTime<Utc>,
    ) -> AuthResult<u64> {
        let mut state = self.state.lock().await;
        let mut revoked = 0;
        for token in state.refresh_tokens.iter_mut().filter(|t| {
            t.user_id == *user_id && t.token_hash == *token_hash && t.revoked_at.is_none()
        }) {
            token.revoke(now);
            revoked += 1;
        }
        Ok(revoked)
    }

    async fn consume_active(
        &self,
        user_id: &UserId,
        token_hash: &TokenHash,
        now: DateTime<Utc>,
    ) -> AuthResult<Option<RefreshToken>> {
        let mut state = self.state.lock().await;
        let consumed = state
            .refresh_tokens
            .iter_mut()
            .find(|t| t.user_id == *user_id && t.token_hash == *token_hash && t.is_active(now))
            .map(|t| {
                t.revoke(now);
                t.clone()
            });
        Ok(consumed)
    }

    async fn revoke_all_for_user(&self, user_id: &UserId, now: DateTime<Utc>) -> AuthResult<u64> {
        let mut state = self.state.lock().await;
        let mut revoked = 0;
        for token in state
            .refresh_tokens
            .iter_mut()
            .filter(|t| t.user_id == *user_id && t.revoked_at.is_none())
        {
            token.revoke(now);
            revoked += 1;
        }
        Ok(revoked)
    }

    async fn delete_expired_refresh_tokens(&self, now: DateTime<Utc>) -> AuthResult<u64> {
        let mut state = self.state.lock().await;
        let before = state.refresh_tokens.len();
        state.refresh_tokens.retain(|t| t.expires_at >= now);
        Ok((before - state.refresh_tokens.len()) as u64)
    }
}

impl PasswordResetRepository for InMemoryAuthRepository {
    async fn save_reset_token(&self, token: &PasswordResetToken) -> AuthResult<()> {
        self.state.lock().await.reset_tokens.push(token.clone());
        Ok(())
    }

    async fn consume_reset_token(
        &self,
        token_hash: &TokenHash,
        now: DateTime<Utc>,
    ) -> AuthResult<Option<PasswordResetToken>> {
        let mut state = self.state.lock().await;
        let consumed = state
            .reset_tokens
            .iter_mut()
            .find(|t| t.token_hash == *token_hash && t.is_usable(now))
            .map(|t| {
                t.used_at = Some(now);
                t.clone()
            });
        Ok(consumed)
    }

    async fn delete_expired_reset_tokens(&self, now: DateTime<Utc>) -> AuthResult<u64> {
        let mut state = self.state.lock().await;
        let before = state.reset_tokens.len();
        state.reset_tokens.retain(|t| t.expires_at >= now);
        Ok((before - state.reset_tokens.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_object::{
        user_password::{RawPassword, UserPassword},
        user_role::UserRole,
    };
    use chrono::Duration;
    use platform::password::{HashParams, PasswordHasher};

    fn user(email: &str) -> User {
        let hasher = PasswordHasher::new(HashParams::testing(), None).unwrap();
        let hash =
            UserPassword::from_raw(&RawPassword::candidate("password1".into()), &hasher).unwrap();
        User::new(Email::new(email).unwrap(), hash, UserRole::User)
    }

    #[tokio::test]
    async fn test_bootstrap_only_into_empty_directory() {
        let repo = InMemoryAuthRepository::new();
        assert!(repo.create_bootstrap_admin(&user("a@x.com")).await.unwrap());
        assert!(!repo.create_bootstrap_admin(&user("b@x.com")).await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let repo = InMemoryAuthRepository::new();
        repo.create(&user("a@x.com")).await.unwrap();
        assert!(matches!(
            repo.create(&user("a@x.com")).await,
            Err(AuthError::EmailTaken)
        ));
        // Case-sensitive keys
        repo.create(&user("A@x.com")).await.unwrap();
    }

    #[tokio::test]
    async fn test_hash_upgrade_requires_unchanged_hash() {
        let repo = InMemoryAuthRepository::new();
        let original = user("a@x.com");
        repo.create(&original).await.unwrap();

        let replaced = user("a@x.com").password_hash;
        repo.set_password(&original.id, &replaced, true, Utc::now())
            .await
            .unwrap();

        let upgraded = user("a@x.com").password_hash;
        assert!(!repo
            .upgrade_password_hash(&original.id, &original.password_hash, &upgraded, Utc::now())
            .await
            .unwrap());
        assert!(repo
            .upgrade_password_hash(&original.id, &replaced, &upgraded, Utc::now())
            .await
            .unwrap());

        let stored = repo.find_by_id(&original.id).await.unwrap().unwrap();
        assert!(stored.password_hash == upgraded);
        assert!(stored.must_change_password);
    }

    #[tokio::test]
    async fn test_targeted_updates_on_missing_user() {
        let repo = InMemoryAuthRepository::new();
        let ghost = user("a@x.com");
        assert!(matches!(
            repo.set_role_and_active(&ghost.id, None, Some(false), Utc::now())
                .await,
            Err(AuthError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn test_consume_active_is_single_use() {
        let repo = InMemoryAuthRepository::new();
        let owner = UserId::new();
        let hash = TokenHash::of("raw");
        let now = Utc::now();
        repo.persist(&RefreshToken::new(owner, hash.clone(), now + Duration::days(1)))
            .await
            .unwrap();

        assert!(repo.consume_active(&owner, &hash, now).await.unwrap().is_some());
        assert!(repo.consume_active(&owner, &hash, now).await.unwrap().is_none());
        assert!(repo.find_active(&owner, &hash, now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_and_foreign_tokens_not_consumed() {
        let repo = InMemoryAuthRepository::new();
        let owner = UserId::new();
        let hash = TokenHash::of("raw");
        let now = Utc::now();
        repo.persist(&RefreshToken::new(owner, hash.clone(), now - Duration::seconds(1)))
            .await
            .unwrap();

        assert!(repo.consume_active(&owner, &hash, now).await.unwrap().is_none());
        assert!(
            repo.consume_active(&UserId::new(), &hash, now)
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(repo.delete_expired_refresh_tokens(now).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let repo = InMemoryAuthRepository::new();
        let token = RefreshToken::new(UserId::new(), TokenHash::of("t"), Utc::now() + Duration::days(1));
        repo.persist(&token).await.unwrap();

        let now = Utc::now();
        repo.revoke(&token.id, now).await.unwrap();
        repo.revoke(&token.id, now + Duration::seconds(5)).await.unwrap();
        repo.revoke(&RefreshTokenId::new(), now).await.unwrap();

        assert_eq!(
            repo.revoke_matching(&token.user_id, &token.token_hash, now)
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_reset_token_single_use() {
        let repo = InMemoryAuthRepository::new();
        let hash = TokenHash::of("reset");
        let now = Utc::now();
        repo.save_reset_token(&PasswordResetToken::new(
            UserId::new(),
            hash.clone(),
            now + Duration::hours(1),
        ))
        .await
        .unwrap();

        assert!(repo.consume_reset_token(&hash, now).await.unwrap().is_some());
        assert!(repo.consume_reset_token(&hash, now).await.unwrap().is_none());
    }
}
