//! Token Hash
//!
//! Deterministic SHA-256 digest (lowercase hex) of a raw bearer secret.
//! Only the digest is persisted; the raw string never leaves the response.

use std::fmt;

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TokenHash(String);

impl TokenHash {
    /// Hash a raw token
    pub fn of(raw: &str) -> Self {
        Self(platform::crypto::sha256_hex(raw.as_bytes()))
    }

    /// Create from database value
    pub fn from_db(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for TokenHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Prefix is enough to correlate log lines
        let prefix: String = self.0.chars().take(8).collect();
        write!(f, "TokenHash({}…)", prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic_and_opaque() {
        let a = TokenHash::of("raw-token");
        let b = TokenHash::of("raw-token");
        assert_eq!(a, b);
        assert_ne!(a.as_str(), "raw-token");
        assert_eq!(a.as_str().len(), 64);
        assert_ne!(a, TokenHash::of("raw-token2"));
    }
}
