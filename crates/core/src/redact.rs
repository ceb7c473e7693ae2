//! Redaction of secret-like fields in request params before audit.

use crate::constants::REDACTION_MARKER;
use serde_json::Value;

/// Key substrings whose values are never written to audit records.
const SECRET_KEY_FRAGMENTS: &[&str] = &[
    "password", "passwd", "secret", "token", "code", "pin", "credential", "apikey", "api_key",
];

fn is_secret_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    SECRET_KEY_FRAGMENTS.iter().any(|frag| lower.contains(frag))
}

/// Return a copy of `params` with secret-like fields replaced by the
/// redaction marker.
///
/// Matching is by key substring, case-insensitive, and recurses through
/// nested objects and arrays. Non-object roots pass through unchanged.
#[must_use]
pub fn redact_params(params: &Value) -> Value {
    match params {
        Value::Object(map) => {
            let redacted = map
                .iter()
                .map(|(key, value)| {
                    if is_secret_key(key) {
                        (key.clone(), Value::String(REDACTION_MARKER.to_string()))
                    } else {
                        (key.clone(), redact_params(value))
                    }
                })
                .collect();
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_params).collect()),
        other => other.clone(),
    }
}
