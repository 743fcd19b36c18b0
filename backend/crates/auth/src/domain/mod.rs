//! Domain Layer
//!
//! Contains entities, value objects, and repository traits.

pub mod entity;
pub mod repository;
pub mod value_object;

// Re-exports
pub use entity::{
    password_reset_token::PasswordResetToken, refresh_token::RefreshToken, user::User,
};
pub use repository::{AuthStore, PasswordResetRepository, RefreshTokenRepository, UserRepository};
