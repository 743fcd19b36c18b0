//! Auth (Authentication) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, repository traits
//! - `application/` - Use cases, token codec, configuration
//! - `infra/` - PostgreSQL and in-memory stores
//! - `presentation/` - HTTP handlers, DTOs, guards, router
//!
//! ## Features
//! - Email + password login, Argon2id hashing
//! - Short-lived access JWTs paired with rotating, revocable refresh JWTs
//! - First user of an empty directory becomes ADMIN; later registrations need an ADMIN
//! - Role-based route policies (ADMIN, USER, VIEWER)
//! - Password reset tokens, password change, admin-issued temporary passwords
//!
//! ## Security Model
//! - Only SHA-256 digests of refresh and reset tokens are stored
//! - A refresh token is consumed by one atomic store update, so it rotates once
//! - Access and refresh tokens use distinct secrets and a `type` claim
//! - Credential failures share one message to prevent account enumeration

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;


// Re-exports for convenience
pub use application::config::{AuthConfig, ConfigError};
pub use domain::repository::AuthStore;
pub use error::{AuthError, AuthResult};
pub use infra::{memory::InMemoryAuthRepository, postgres::PgAuthRepository};
pub use presentation::handlers::AuthAppState;
pub use presentation::router::{auth_router, users_router};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

// Convenience re-exports
pub mod models {
    pub use crate::domain::entity::*;
    pub use crate::domain::value_object::*;
    pub use crate::presentation::dto::*;
}

pub mod middleware {
    pub use crate::presentation::extract::*;
    pub use crate::presentation::middleware::*;
}
