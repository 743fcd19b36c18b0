//! Platform Crate - Technical Infrastructure
//!
//! Domain-free building blocks shared by backend crates:
//! - Password hashing (Argon2id) and password policy
//! - SHA-256 digests and random opaque tokens
//! - Human-readable TTL parsing (`"15m"`, `"7d"`)

pub mod crypto;
pub mod duration;
pub mod password;
