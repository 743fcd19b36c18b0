//! Password Hashing and Verification
//!
//! - Argon2id hashing with a per-hash random salt and configurable cost
//! - Length policy on Unicode code points after NFKC normalization
//! - Zeroization of clear-text material
//! - Optional application-wide pepper
//!
//! Verification is constant-time inside `argon2` and reads the cost
//! parameters from the stored PHC string, so hashes created under older
//! parameters keep verifying after the configuration changes.

use std::fmt;

use argon2::password_hash::{PasswordHasher as _, PasswordVerifier as _, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHash, Version};
use rand::rngs::OsRng;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Minimum password length in code points
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length in code points
pub const MAX_PASSWORD_LENGTH: usize = 128;

// ============================================================================
// Error Types
// ============================================================================

/// Password policy violation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordPolicyError {
    #[error("Password must be at least {min} characters (got {actual})")]
    TooShort { min: usize, actual: usize },

    #[error("Password must be at most {max} characters (got {actual})")]
    TooLong { max: usize, actual: usize },

    #[error("Password cannot be empty or contain only whitespace")]
    EmptyOrWhitespace,

    #[error("Password contains invalid control characters")]
    InvalidCharacter,
}

/// Password hashing/verification errors
#[derive(Debug, Error)]
pub enum PasswordHashError {
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    #[error("Invalid password hash format")]
    InvalidHashFormat,

    #[error("Invalid hashing parameters: {0}")]
    InvalidParams(String),
}

// ============================================================================
// Clear Text Password (Zeroized on drop)
// ============================================================================

/// Clear text password, NFKC-normalized, wiped from memory on drop.
///
/// Not `Clone`; `Debug` is redacted.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ClearTextPassword(String);

impl ClearTextPassword {
    /// Normalize and validate a password chosen by a user
    pub fn new(raw: String) -> Result<Self, PasswordPolicyError> {
        let candidate = Self::normalized(raw);
        let normalized = candidate.0.as_str();

        if normalized.trim().is_empty() {
            return Err(PasswordPolicyError::EmptyOrWhitespace);
        }

        let char_count = normalized.chars().count();

        if char_count < MIN_PASSWORD_LENGTH {
            return Err(PasswordPolicyError::TooShort {
                min: MIN_PASSWORD_LENGTH,
                actual: char_count,
            });
        }

        if char_count > MAX_PASSWORD_LENGTH {
            return Err(PasswordPolicyError::TooLong {
                max: MAX_PASSWORD_LENGTH,
                actual: char_count,
            });
        }

        if normalized
            .chars()
            .any(|ch| ch.is_control() && ch != '\t' && ch != '\n')
        {
            return Err(PasswordPolicyError::InvalidCharacter);
        }

        Ok(candidate)
    }

    /// Normalize a password presented for verification.
    ///
    /// No policy is applied: a login attempt must fail the same way whether
    /// the input violates the policy or simply does not match.
    pub fn for_verification(raw: String) -> Self {
        Self::normalized(raw)
    }

    fn normalized(mut raw: String) -> Self {
        let normalized: String = raw.nfkc().collect();
        raw.zeroize();
        Self(normalized)
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for ClearTextPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClearTextPassword")
            .field(&"[REDACTED]")
            .finish()
    }
}

// ============================================================================
// Hashed Password (Safe to store)
// ============================================================================

/// Argon2id hash in PHC string format (algorithm, version, params, salt, hash)
#[derive(Clone, PartialEq, Eq)]
pub struct HashedPassword {
    hash: String,
}

impl HashedPassword {
    /// Parse a stored PHC string; malformed input is an error
    pub fn from_phc_string(s: impl Into<String>) -> Result<Self, PasswordHashError> {
        let hash = s.into();
        PasswordHash::new(&hash).map_err(|_| PasswordHashError::InvalidHashFormat)?;
        Ok(Self { hash })
    }

    pub fn as_phc_string(&self) -> &str {
        &self.hash
    }
}

impl fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashedPassword")
            .field("hash", &"[HASH]")
            .finish()
    }
}

// ============================================================================
// Hasher
// ============================================================================

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashParams {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes (time cost)
    pub iterations: u32,
    /// Lanes
    pub parallelism: u32,
}

impl HashParams {
    /// Lowest memory cost accepted from configuration (OWASP: 7 MiB with t=5)
    pub const MIN_MEMORY_KIB: u32 = 7 * 1024;

    /// Tiny parameters that keep test suites fast. Never use in production.
    pub const fn testing() -> Self {
        Self {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        }
    }

    fn to_argon2(self) -> Result<Params, PasswordHashError> {
        Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| PasswordHashError::InvalidParams(e.to_string()))
    }
}

impl Default for HashParams {
    /// OWASP baseline for Argon2id: m=19456 (19 MiB), t=2, p=1
    fn default() -> Self {
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// One-way salted password hashing
#[derive(Clone)]
pub struct PasswordHasher {
    params: HashParams,
    argon2: Argon2<'static>,
    pepper: Option<Zeroizing<Vec<u8>>>,
}

impl PasswordHasher {
    pub fn new(params: HashParams, pepper: Option<Vec<u8>>) -> Result<Self, PasswordHashError> {
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.to_argon2()?);
        Ok(Self {
            params,
            argon2,
            pepper: pepper.map(Zeroizing::new),
        })
    }

    pub fn params(&self) -> HashParams {
        self.params
    }

    /// Hash with a fresh random salt (128 bits)
    pub fn hash(&self, password: &ClearTextPassword) -> Result<HashedPassword, PasswordHashError> {
        let input = self.peppered(password);
        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2
            .hash_password(&input, &salt)
            .map_err(|e| PasswordHashError::HashingFailed(e.to_string()))?;

        Ok(HashedPassword {
            hash: hash.to_string(),
        })
    }

    /// `true` iff the password matches. Never fails on a mismatch.
    pub fn verify(&self, password: &ClearTextPassword, hashed: &HashedPassword) -> bool {
        let Ok(parsed) = PasswordHash::new(&hashed.hash) else {
            return false;
        };
        self.argon2
            .verify_password(&self.peppered(password), &parsed)
            .is_ok()
    }

    /// Verify against a raw PHC string; only a malformed hash is an error
    pub fn verify_phc(
        &self,
        password: &ClearTextPassword,
        phc: &str,
    ) -> Result<bool, PasswordHashError> {
        let hashed = HashedPassword::from_phc_string(phc)?;
        Ok(self.verify(password, &hashed))
    }

    /// Whether `hashed` was produced with other parameters than the current ones
    pub fn needs_rehash(&self, hashed: &HashedPassword) -> bool {
        let Ok(parsed) = PasswordHash::new(&hashed.hash) else {
            return true;
        };

        if parsed.algorithm != Algorithm::Argon2id.ident() {
            return true;
        }

        match Params::try_from(&parsed) {
            Ok(stored) => {
                stored.m_cost() != self.params.memory_kib
                    || stored.t_cost() != self.params.iterations
                    || stored.p_cost() != self.params.parallelism
            }
            Err(_) => true,
        }
    }

    fn peppered(&self, password: &ClearTextPassword) -> Zeroizing<Vec<u8>> {
        let mut bytes = Zeroizing::new(password.as_bytes().to_vec());
        if let Some(pepper) = &self.pepper {
            bytes.extend_from_slice(pepper);
        }
        bytes
    }
}

impl fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("params", &self.params)
            .field("pepper", &self.pepper.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(HashParams::testing(), None).unwrap()
    }

    fn clear(s: &str) -> ClearTextPassword {
        ClearTextPassword::for_verification(s.to_string())
    }

    #[test]
    fn test_password_too_short() {
        let result = ClearTextPassword::new("short".to_string());
        assert_eq!(
            result.unwrap_err(),
            PasswordPolicyError::TooShort { min: 8, actual: 5 }
        );
    }

    #[test]
    fn test_password_exactly_min_length() {
        assert!(ClearTextPassword::new("abcdefgh".to_string()).is_ok());
    }

    #[test]
    fn test_password_too_long() {
        let long_password = "a".repeat(MAX_PASSWORD_LENGTH + 1);
        let result = ClearTextPassword::new(long_password);
        assert!(matches!(result, Err(PasswordPolicyError::TooLong { .. })));
    }

    #[test]
    fn test_password_whitespace_only() {
        let result = ClearTextPassword::new("          ".to_string());
        assert_eq!(result.unwrap_err(), PasswordPolicyError::EmptyOrWhitespace);
    }

    #[test]
    fn test_password_control_character() {
        let result = ClearTextPassword::new("abc\u{0007}defgh".to_string());
        assert_eq!(result.unwrap_err(), PasswordPolicyError::InvalidCharacter);
    }

    #[test]
    fn test_length_counts_code_points() {
        // 8 code points, 24 bytes
        assert!(ClearTextPassword::new("パスワード安全だ".to_string()).is_ok());
    }

    #[test]
    fn test_hash_is_not_plaintext_and_verifies() {
        let hasher = hasher();
        let password = clear("Correct Horse Battery");
        let hashed = hasher.hash(&password).unwrap();

        assert_ne!(hashed.as_phc_string(), "Correct Horse Battery");
        assert!(hashed.as_phc_string().starts_with("$argon2id$"));
        assert!(hasher.verify(&password, &hashed));
        assert!(!hasher.verify(&clear("Correct Horse Battery!"), &hashed));
    }

    #[test]
    fn test_salt_differs_per_hash() {
        let hasher = hasher();
        let password = clear("same password");
        let a = hasher.hash(&password).unwrap();
        let b = hasher.hash(&password).unwrap();
        assert_ne!(a, b);
        assert!(hasher.verify(&password, &a));
        assert!(hasher.verify(&password, &b));
    }

    #[test]
    fn test_nfkc_equivalent_inputs_verify() {
        let hasher = hasher();
        // Fullwidth "ＡＢＣ" normalizes to "ABC"
        let hashed = hasher.hash(&clear("ＡＢＣsecret1")).unwrap();
        assert!(hasher.verify(&clear("ABCsecret1"), &hashed));
    }

    #[test]
    fn test_pepper() {
        let peppered = PasswordHasher::new(HashParams::testing(), Some(b"pepper".to_vec())).unwrap();
        let plain = hasher();
        let password = clear("TestPassword123!");
        let hashed = peppered.hash(&password).unwrap();

        assert!(peppered.verify(&password, &hashed));
        assert!(!plain.verify(&password, &hashed));
    }

    #[test]
    fn test_verify_phc_rejects_malformed_hash_only() {
        let hasher = hasher();
        let password = clear("whatever1");
        assert!(matches!(
            hasher.verify_phc(&password, "not_a_valid_hash"),
            Err(PasswordHashError::InvalidHashFormat)
        ));

        let hashed = hasher.hash(&clear("different1")).unwrap();
        assert_eq!(
            hasher.verify_phc(&password, hashed.as_phc_string()).unwrap(),
            false
        );
    }

    #[test]
    fn test_needs_rehash_after_param_change() {
        let old = hasher();
        let password = clear("TestPassword123!");
        let hashed = old.hash(&password).unwrap();
        assert!(!old.needs_rehash(&hashed));

        let stronger = PasswordHasher::new(
            HashParams {
                memory_kib: 128,
                ..HashParams::testing()
            },
            None,
        )
        .unwrap();
        assert!(stronger.needs_rehash(&hashed));
        // Old hashes still verify under the new configuration
        assert!(stronger.verify(&password, &hashed));
    }

    #[test]
    fn test_invalid_params() {
        let result = PasswordHasher::new(
            HashParams {
                memory_kib: 0,
                iterations: 0,
                parallelism: 0,
            },
            None,
        );
        assert!(matches!(result, Err(PasswordHashError::InvalidParams(_))));
    }

    #[test]
    fn test_debug_redaction() {
        let password = clear("secret-value");
        let debug_output = format!("{:?}", password);
        assert!(debug_output.contains("REDACTED"));
        assert!(!debug_output.contains("secret"));

        let hasher = PasswordHasher::new(HashParams::testing(), Some(b"pep".to_vec())).unwrap();
        assert!(!format!("{:?}", hasher).contains("pep\""));
    }
}
