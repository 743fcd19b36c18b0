//! Human-readable TTL strings
//!
//! Unit forms (`15m`, `7d`, `1h 30m`) go through `humantime`. A bare integer
//! is read as seconds. Whitespace around the value is ignored; zero,
//! sub-second and overflowing values are rejected.

use std::time::Duration;

use humantime::DurationError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TtlParseError {
    #[error("TTL is empty")]
    Empty,

    #[error("TTL `{0}` is not a whole-second duration like `15m` or `7d`")]
    Malformed(String),

    #[error("TTL must be greater than zero")]
    Zero,

    #[error("TTL `{0}` is too large")]
    Overflow(String),
}

/// Parse `"15m"`, `"7d"`, `"3600"` into a whole-second [`Duration`]
pub fn parse_ttl(raw: &str) -> Result<Duration, TtlParseError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(TtlParseError::Empty);
    }

    let ttl = if value.bytes().all(|b| b.is_ascii_digit()) {
        let secs: u64 = value
            .parse()
            .map_err(|_| TtlParseError::Overflow(value.to_string()))?;
        Duration::from_secs(secs)
    } else {
        humantime::parse_duration(value).map_err(|e| match e {
            DurationError::NumberOverflow => TtlParseError::Overflow(value.to_string()),
            _ => TtlParseError::Malformed(value.to_string()),
        })?
    };

    if ttl.subsec_nanos() != 0 {
        return Err(TtlParseError::Malformed(value.to_string()));
    }
    if ttl.is_zero() {
        return Err(TtlParseError::Zero);
    }

    Ok(ttl)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units() {
        assert_eq!(parse_ttl("45s"), Ok(Duration::from_secs(45)));
        assert_eq!(parse_ttl("15m"), Ok(Duration::from_secs(900)));
        assert_eq!(parse_ttl("12h"), Ok(Duration::from_secs(43_200)));
        assert_eq!(parse_ttl("7d"), Ok(Duration::from_secs(604_800)));
        assert_eq!(parse_ttl("2w"), Ok(Duration::from_secs(1_209_600)));
    }

    #[test]
    fn test_bare_seconds_and_whitespace() {
        assert_eq!(parse_ttl("3600"), Ok(Duration::from_secs(3600)));
        assert_eq!(parse_ttl("  10m "), Ok(Duration::from_secs(600)));
        assert_eq!(parse_ttl("1h 30m"), Ok(Duration::from_secs(5400)));
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(parse_ttl(""), Err(TtlParseError::Empty));
        assert!(matches!(parse_ttl("abc"), Err(TtlParseError::Malformed(_))));
        assert!(matches!(parse_ttl("m15"), Err(TtlParseError::Malformed(_))));
        assert!(matches!(parse_ttl("-5m"), Err(TtlParseError::Malformed(_))));
        assert!(matches!(parse_ttl("1500ms"), Err(TtlParseError::Malformed(_))));
        assert!(matches!(parse_ttl("5 parsecs"), Err(TtlParseError::Malformed(_))));
        assert_eq!(parse_ttl("0s"), Err(TtlParseError::Zero));
    }

    #[test]
    fn test_overflow() {
        assert!(matches!(
            parse_ttl("99999999999999999999w"),
            Err(TtlParseError::Overflow(_))
        ));
        assert!(matches!(
            parse_ttl("99999999999999999999"),
            Err(TtlParseError::Overflow(_))
        ));
    }
}
