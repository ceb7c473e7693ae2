//! Strict identifier syntax gate for resource and action names.
//!
//! This is the first and cheapest line of defense against path traversal or
//! injection through route components: names must be plain alphanumeric
//! identifiers before any filesystem or registry lookup happens.

use crate::constants::MAX_IDENTIFIER_LEN;
use once_cell::sync::Lazy;
use regex::Regex;

/// The pattern enforced when no custom pattern is configured.
pub const DEFAULT_IDENTIFIER_PATTERN: &str = r"^[A-Za-z][A-Za-z0-9]{0,63}$";

static DEFAULT_GATE: Lazy<IdentifierGate> = Lazy::new(|| {
    IdentifierGate::new(DEFAULT_IDENTIFIER_PATTERN).expect("default identifier pattern is valid")
});

/// Compiled identifier syntax gate.
///
/// The length cap applies regardless of the configured pattern, so a lax
/// custom pattern cannot admit unbounded names.
#[derive(Debug, Clone)]
pub struct IdentifierGate {
    pattern: Regex,
}

impl IdentifierGate {
    /// Compile a gate from a configured pattern.
    pub fn new(pattern: &str) -> std::result::Result<Self, String> {
        let pattern = Regex::new(pattern)
            .map_err(|e| format!("identifier pattern does not compile: {e}"))?;
        Ok(Self { pattern })
    }

    #[must_use]
    pub fn is_valid(&self, name: &str) -> bool {
        name.len() <= MAX_IDENTIFIER_LEN && self.pattern.is_match(name)
    }

    /// Validate an identifier, returning a description of the violation.
    pub fn validate(&self, name: &str) -> std::result::Result<(), String> {
        if name.is_empty() {
            return Err("identifier is empty".to_string());
        }
        if name.len() > MAX_IDENTIFIER_LEN {
            return Err(format!("identifier exceeds {MAX_IDENTIFIER_LEN} characters"));
        }
        if !self.pattern.is_match(name) {
            return Err(format!("identifier '{name}' fails the syntax gate"));
        }
        Ok(())
    }
}

impl Default for IdentifierGate {
    fn default() -> Self {
        DEFAULT_GATE.clone()
    }
}

/// Whether `name` is a valid identifier under the default gate.
///
/// Valid identifiers start with a letter, contain only ASCII letters and
/// digits, and are at most [`MAX_IDENTIFIER_LEN`] characters. Path
/// separators, traversal sequences, and any other punctuation fail.
#[must_use]
pub fn is_valid_identifier(name: &str) -> bool {
    DEFAULT_GATE.is_valid(name)
}

/// Validate an identifier under the default gate.
pub fn validate_identifier(name: &str) -> std::result::Result<(), String> {
    DEFAULT_GATE.validate(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_identifiers() {
        for name in ["Auth", "register", "UserProfile2", "a"] {
            assert!(is_valid_identifier(name), "{name} should be valid");
        }
    }

    #[test]
    fn rejects_traversal_and_separators() {
        for name in [
            "..",
            "../Auth",
            "Auth/..",
            "a/b",
            "a\\b",
            "Auth.handler",
            "auth handler",
            "",
            ".",
            "_auth",
            "9lives",
            "naïve",
        ] {
            assert!(!is_valid_identifier(name), "{name:?} should be rejected");
        }
    }

    #[test]
    fn rejects_overlong_identifiers() {
        let name = "a".repeat(MAX_IDENTIFIER_LEN + 1);
        assert!(!is_valid_identifier(&name));
        let name = "a".repeat(MAX_IDENTIFIER_LEN);
        assert!(is_valid_identifier(&name));
    }

    #[test]
    fn validate_reports_reason() {
        assert!(validate_identifier("").unwrap_err().contains("empty"));
        assert!(validate_identifier("a/b").unwrap_err().contains("a/b"));
    }

    #[test]
    fn custom_gate_still_caps_length() {
        let gate = IdentifierGate::new(r"^[a-z]+$").unwrap();
        assert!(gate.is_valid("abc"));
        assert!(!gate.is_valid("ABC"));
        assert!(!gate.is_valid(&"a".repeat(MAX_IDENTIFIER_LEN + 1)));
    }

    #[test]
    fn invalid_pattern_is_reported() {
        assert!(IdentifierGate::new("([unclosed").is_err());
    }
}
