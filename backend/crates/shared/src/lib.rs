//! Shared Kernel
//!
//! Vocabulary every backend crate agrees on:
//! - Error classification ([`error::kind::ErrorKind`]) and the unified
//!   [`error::app_error::AppError`] rendered at the HTTP boundary
//! - Typed UUID identifiers ([`id::Id`])
//!
//! Keep this crate small. Anything domain-specific belongs to the owning crate.

pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod kind;
}
pub mod id;
