//! Shared constants for the txgate workspace.

/// Environment variable overriding the configuration file location
pub const TXGATE_CONFIG_VAR: &str = "TXGATE_CONFIG";

/// Environment variable overriding the sandbox root directory
pub const TXGATE_SANDBOX_ROOT_VAR: &str = "TXGATE_SANDBOX_ROOT";

/// Environment variable overriding the data directory
pub const TXGATE_DATA_DIR_VAR: &str = "TXGATE_DATA_DIR";

/// Environment variable overriding the audit log path
pub const TXGATE_AUDIT_LOG_VAR: &str = "TXGATE_AUDIT_LOG";

/// Default configuration file name
pub const CONFIG_FILENAME: &str = "txgate.json";

/// Default audit log file name
pub const AUDIT_LOG_FILENAME: &str = "audit.jsonl";

/// Maximum accepted length for resource and action identifiers
pub const MAX_IDENTIFIER_LEN: usize = 64;

/// Marker placed in audit records where a secret-like value was removed
pub const REDACTION_MARKER: &str = "[REDACTED]";

/// Tracing target for containment violations (potential intrusion attempts)
pub const CONTAINMENT_TARGET: &str = "security.containment";
