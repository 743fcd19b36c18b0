//! Entities

pub mod password_reset_token;
pub mod refresh_token;
pub mod user;
