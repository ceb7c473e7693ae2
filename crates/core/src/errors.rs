use std::path::PathBuf;
use std::time::Duration;

/// Result type alias for txgate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for txgate operations
///
/// The dispatch-facing variants (`RouteNotFound`, `InvalidRoute`, `Denied`,
/// `Load`, `Containment`, `MethodNotFound`, `Business`, `Unknown`) form the
/// error taxonomy a dispatch attempt can terminate with. The remaining
/// variants cover ambient concerns: durable store access, configuration,
/// file system I/O, and deadlines.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transaction code has no route definition
    #[error("no route registered for transaction code {code}")]
    RouteNotFound { code: u32 },

    /// A store-sourced route failed defensive syntax validation
    #[error("route for transaction code {code} is malformed: {detail}")]
    InvalidRoute { code: u32, detail: String },

    /// The caller's profile is not authorized for the resolved route
    #[error("profile {profile_id} is not authorized for {resource}.{action}")]
    Denied {
        profile_id: u32,
        resource: String,
        action: String,
    },

    /// Handler loading or instantiation failed
    #[error("failed to load handler for resource '{resource}': {detail}")]
    Load { resource: String, detail: String },

    /// A resolved handler location escaped the sandbox root
    ///
    /// Security-class load failure. Callers must collapse this to a generic
    /// message; the offending path is only for internal logs.
    #[error("handler path for resource '{resource}' escapes the sandbox root")]
    Containment { resource: String, path: PathBuf },

    /// The handler exists but does not expose the requested action
    #[error("resource '{resource}' has no action '{action}'")]
    MethodNotFound { resource: String, action: String },

    /// Business-level failure raised by handler logic; detail is caller-visible
    #[error("{message}")]
    Business {
        message: String,
        data: Option<serde_json::Value>,
    },

    /// Uncategorized failure during dispatch
    #[error("dispatch failed: {detail}")]
    Unknown { detail: String },

    /// Durable store access errors
    #[error("store {operation} failed: {message}")]
    Store {
        operation: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration errors
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// File system operations
    #[error("file system {operation} operation failed for '{path}': {source}")]
    Io {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// Operation deadline exceeded
    #[error("operation '{operation}' timed out after {duration:?}")]
    Timeout { operation: String, duration: Duration },
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Json {
            message: error.to_string(),
            source: error,
        }
    }
}

// Helper methods for creating errors with context
impl Error {
    /// Create a route-not-found error
    #[must_use]
    pub fn route_not_found(code: u32) -> Self {
        Error::RouteNotFound { code }
    }

    /// Create an invalid-route error
    #[must_use]
    pub fn invalid_route(code: u32, detail: impl Into<String>) -> Self {
        Error::InvalidRoute {
            code,
            detail: detail.into(),
        }
    }

    /// Create an authorization-denied error
    #[must_use]
    pub fn denied(profile_id: u32, resource: impl Into<String>, action: impl Into<String>) -> Self {
        Error::Denied {
            profile_id,
            resource: resource.into(),
            action: action.into(),
        }
    }

    /// Create a handler load error
    #[must_use]
    pub fn load(resource: impl Into<String>, detail: impl Into<String>) -> Self {
        Error::Load {
            resource: resource.into(),
            detail: detail.into(),
        }
    }

    /// Create a containment violation error
    #[must_use]
    pub fn containment(resource: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Error::Containment {
            resource: resource.into(),
            path: path.into(),
        }
    }

    /// Create a method-not-found error
    #[must_use]
    pub fn method_not_found(resource: impl Into<String>, action: impl Into<String>) -> Self {
        Error::MethodNotFound {
            resource: resource.into(),
            action: action.into(),
        }
    }

    /// Create a business error from handler logic
    #[must_use]
    pub fn business(message: impl Into<String>) -> Self {
        Error::Business {
            message: message.into(),
            data: None,
        }
    }

    /// Create a business error carrying structured detail
    #[must_use]
    pub fn business_with_data(message: impl Into<String>, data: serde_json::Value) -> Self {
        Error::Business {
            message: message.into(),
            data: Some(data),
        }
    }

    /// Create an uncategorized dispatch error
    #[must_use]
    pub fn unknown(detail: impl Into<String>) -> Self {
        Error::Unknown {
            detail: detail.into(),
        }
    }

    /// Create a store error
    #[must_use]
    pub fn store(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Store {
            operation: operation.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a store error with a source error
    #[must_use]
    pub fn store_with_source(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::Store {
            operation: operation.into(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Create a file system error with context
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, operation: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }

    /// Create a timeout error
    #[must_use]
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Error::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Whether this error's detail is safe to show to the caller.
    ///
    /// `Load`, `Containment`, `Unknown`, store and I/O failures carry
    /// internals (paths, identifiers, source chains) that must stay in the
    /// logs; everything else is already minimal.
    #[must_use]
    pub fn is_client_safe(&self) -> bool {
        matches!(
            self,
            Error::RouteNotFound { .. }
                | Error::InvalidRoute { .. }
                | Error::Denied { .. }
                | Error::MethodNotFound { .. }
                | Error::Business { .. }
        )
    }

    /// The generic message that crosses the sandbox boundary for errors whose
    /// detail is not client-safe.
    #[must_use]
    pub fn client_message(&self) -> String {
        if self.is_client_safe() {
            self.to_string()
        } else {
            "internal error during dispatch".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_facing_errors_keep_their_detail() {
        let err = Error::denied(7, "Auth", "register");
        assert!(err.is_client_safe());
        assert!(err.client_message().contains("profile 7"));
    }

    #[test]
    fn internal_errors_collapse_to_generic_message() {
        let load = Error::load("Auth", "handler marker missing");
        let containment = Error::containment("Auth", "/etc/passwd");
        let unknown = Error::unknown("panicked");
        for err in [load, containment, unknown] {
            assert!(!err.is_client_safe());
            assert_eq!(err.client_message(), "internal error during dispatch");
        }
    }

    #[test]
    fn business_error_detail_is_caller_visible() {
        let err = Error::business("insufficient balance");
        assert!(err.is_client_safe());
        assert_eq!(err.client_message(), "insufficient balance");
    }
}
