//! Application Configuration
//!
//! Built once at startup from the environment and passed into constructors.

use std::fmt;
use std::time::Duration;

use platform::duration::parse_ttl;
use platform::password::{HashParams, PasswordHashError, PasswordHasher};
use thiserror::Error;

/// Minimum signing secret length in characters
pub const MIN_SECRET_LENGTH: usize = 32;

/// TTL used when a configured duration cannot be parsed or is out of range
pub const FALLBACK_TTL: Duration = Duration::from_secs(900);

/// Longest accepted TTL (365 days)
pub const MAX_TTL: Duration = Duration::from_secs(365 * 86_400);

pub const DEFAULT_ACCESS_TTL: &str = "15m";
pub const DEFAULT_REFRESH_TTL: &str = "7d";
pub const DEFAULT_PASSWORD_RESET_TTL: &str = "1h";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} must be at least {min} characters")]
    SecretTooShort { name: &'static str, min: usize },

    #[error("JWT_ACCESS_SECRET and JWT_REFRESH_SECRET must differ")]
    SecretsNotDistinct,

    #[error("{name} is not a valid number: {value:?}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("{name} must be at least {min}")]
    BelowMinimum { name: &'static str, min: u32 },
}

/// Signing secret and lifetime for one token kind
#[derive(Clone)]
pub struct TokenSettings {
    pub secret: String,
    pub ttl: Duration,
}

impl fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSettings")
            .field("secret", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Auth application configuration
#[derive(Clone)]
pub struct AuthConfig {
    pub access: TokenSettings,
    pub refresh: TokenSettings,
    /// Lifetime of a password reset token
    pub password_reset_ttl: Duration,
    /// Argon2id cost
    pub password_hash: HashParams,
    /// Password pepper (optional, application-wide secret)
    pub password_pepper: Option<Vec<u8>>,
}

impl AuthConfig {
    /// Read configuration from process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let access_secret = required_secret(&lookup, "JWT_ACCESS_SECRET")?;
        let refresh_secret = required_secret(&lookup, "JWT_REFRESH_SECRET")?;

        if access_secret == refresh_secret {
            return Err(ConfigError::SecretsNotDistinct);
        }

        let defaults = HashParams::default();
        let password_hash = HashParams {
            memory_kib: bounded_u32(
                &lookup,
                "PASSWORD_HASH_MEMORY_KIB",
                defaults.memory_kib,
                HashParams::MIN_MEMORY_KIB,
            )?,
            iterations: bounded_u32(&lookup, "PASSWORD_HASH_ITERATIONS", defaults.iterations, 1)?,
            parallelism: defaults.parallelism,
        };

        let password_pepper = lookup("PASSWORD_PEPPER")
            .filter(|p| !p.is_empty())
            .map(String::into_bytes);

        Ok(Self {
            access: TokenSettings {
                secret: access_secret,
                ttl: ttl(&lookup, "JWT_ACCESS_TTL", DEFAULT_ACCESS_TTL),
            },
            refresh: TokenSettings {
                secret: refresh_secret,
                ttl: ttl(&lookup, "JWT_REFRESH_TTL", DEFAULT_REFRESH_TTL),
            },
            password_reset_ttl: ttl(&lookup, "PASSWORD_RESET_TTL", DEFAULT_PASSWORD_RESET_TTL),
            password_hash,
            password_pepper,
        })
    }

    /// Fixed secrets and minimal hashing cost. Never use in production.
    pub fn for_tests() -> Self {
        Self {
            access: TokenSettings {
                secret: "test-access-secret-0123456789abcdef".to_string(),
                ttl: Duration::from_secs(15 * 60),
            },
            refresh: TokenSettings {
                secret: "test-refresh-secret-0123456789abcdef".to_string(),
                ttl: Duration::from_secs(7 * 24 * 3600),
            },
            password_reset_ttl: Duration::from_secs(3600),
            password_hash: HashParams::testing(),
            password_pepper: None,
        }
    }

    /// Build the password hasher for these settings
    pub fn password_hasher(&self) -> Result<PasswordHasher, PasswordHashError> {
        PasswordHasher::new(self.password_hash, self.password_pepper.clone())
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("access", &self.access)
            .field("refresh", &self.refresh)
            .field("password_reset_ttl", &self.password_reset_ttl)
            .field("password_hash", &self.password_hash)
            .field(
                "password_pepper",
                &self.password_pepper.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

fn required_secret<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let secret = lookup(name)
        .filter(|s| !s.trim().is_empty())
        .ok_or(ConfigError::Missing(name))?;

    if secret.chars().count() < MIN_SECRET_LENGTH {
        return Err(ConfigError::SecretTooShort {
            name,
            min: MIN_SECRET_LENGTH,
        });
    }

    Ok(secret)
}

/// Unparseable durations, and durations above [`MAX_TTL`], fall back to
/// [`FALLBACK_TTL`] with a warning
fn ttl<F>(lookup: &F, name: &'static str, default: &str) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(name).unwrap_or_else(|| default.to_string());

    let parsed = parse_ttl(&raw).map_err(|e| e.to_string()).and_then(|ttl| {
        if ttl > MAX_TTL {
            Err(format!("exceeds maximum of {}s", MAX_TTL.as_secs()))
        } else {
            Ok(ttl)
        }
    });

    parsed.unwrap_or_else(|e| {
        tracing::warn!(
            variable = name,
            value = %raw,
            error = %e,
            fallback_secs = FALLBACK_TTL.as_secs(),
            "Invalid TTL, using fallback"
        );
        FALLBACK_TTL
    })
}

fn bounded_u32<F>(lookup: &F, name: &'static str, default: u32, min: u32) -> Result<u32, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(name) else {
        return Ok(default);
    };

    let value: u32 = raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        name,
        value: raw.clone(),
    })?;

    if value < min {
        return Err(ConfigError::BelowMinimum { name, min });
    }

    Ok(value)
}
