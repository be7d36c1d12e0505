//! Masking of the values this tool exists to protect.
//!
//! The hostname and IP address under test are exactly what must not leak, so
//! debug logs show them masked unless `CLEANCHECK_ALLOW_DEBUG_PII=true`.

use lazy_static::lazy_static;

lazy_static! {
    /// Read once: whether PII may appear verbatim in debug logs.
    static ref PII_DEBUG_ALLOWED: bool = {
        std::env::var("CLEANCHECK_ALLOW_DEBUG_PII")
            .map(|s| s.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    };
}

pub fn redact_sensitive(s: &str) -> String {
    const MAX_LEN: usize = 8;
    if s.len() <= MAX_LEN {
        "[REDACTED]".to_string()
    } else {
        format!("[REDACTED: {} chars]", s.len())
    }
}

/// The form of `sensitive` that may be written to a log.
pub fn loggable(sensitive: &str) -> String {
    if *PII_DEBUG_ALLOWED {
        sensitive.to_string()
    } else {
        redact_sensitive(sensitive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_values_are_fully_masked() {
        assert_eq!(redact_sensitive("host1"), "[REDACTED]");
    }

    #[test]
    fn long_values_keep_only_length() {
        assert_eq!(redact_sensitive("10.20.30.40"), "[REDACTED: 11 chars]");
    }
}
