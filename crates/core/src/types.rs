//! Domain data structures for transaction dispatch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A resolved `(resource, action)` pair a transaction code maps to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Route {
    /// Resource (business object) name
    pub resource: String,
    /// Action (method) name on the resource
    pub action: String,
}

impl Route {
    pub fn new(resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            action: action.into(),
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.resource, self.action)
    }
}

/// One row of the transaction table: a numeric code bound to a route.
///
/// Codes are unique; definitions are owned by the route table and immutable
/// between reloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDefinition {
    /// Numeric transaction code submitted by callers
    pub code: u32,
    /// Resource name the code routes to
    pub resource: String,
    /// Action name the code routes to
    pub action: String,
}

impl TransactionDefinition {
    pub fn route(&self) -> Route {
        Route::new(self.resource.clone(), self.action.clone())
    }
}

/// "Profile X may invoke action Y on resource Z."
///
/// Many-to-many; no ordering significance. Owned by the permission cache and
/// mutated only through grant/revoke.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionEntry {
    /// Role identifier the permission is granted to
    pub profile_id: u32,
    /// Resource name
    pub resource: String,
    /// Action name
    pub action: String,
}

/// Caller context supplied per request by the session collaborator.
///
/// The dispatch core never issues or validates identities; it only consumes
/// the profile id for authorization and the request id for audit correlation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Role identifier used as the subject of permission checks
    pub profile_id: u32,
    /// Opaque request/session identifier for audit correlation
    pub request_id: String,
}

impl Identity {
    pub fn new(profile_id: u32, request_id: impl Into<String>) -> Self {
        Self {
            profile_id,
            request_id: request_id.into(),
        }
    }

    /// Identity with a freshly generated correlation id, for callers whose
    /// transport layer does not supply one.
    pub fn with_generated_request_id(profile_id: u32) -> Self {
        Self {
            profile_id,
            request_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// Terminal classification of a dispatch attempt as recorded for audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchStatus {
    /// Handler executed and returned a result
    Success,
    /// Authorization check failed
    Denied,
    /// Transaction code had no route
    NotFound,
    /// Handler could not be loaded (includes containment violations and
    /// malformed routes)
    LoadError,
    /// Handler logic raised a business-level error
    BusinessError,
}

impl std::fmt::Display for DispatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DispatchStatus::Success => "success",
            DispatchStatus::Denied => "denied",
            DispatchStatus::NotFound => "not_found",
            DispatchStatus::LoadError => "load_error",
            DispatchStatus::BusinessError => "business_error",
        };
        f.write_str(s)
    }
}

/// One audit record per dispatch attempt.
///
/// Created by the dispatcher after the attempt reaches a terminal state,
/// handed to the audit sink, never retained by the core. Params are redacted
/// before the outcome is constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchOutcome {
    /// Request/session identifier from the caller's identity
    pub request_id: String,
    /// Profile that issued the request
    pub profile_id: u32,
    /// Resolved resource name, if resolution got that far
    pub resource: Option<String>,
    /// Resolved action name, if resolution got that far
    pub action: Option<String>,
    /// Transaction code as submitted
    pub code: u32,
    /// Terminal classification
    pub status: DispatchStatus,
    /// Short human-readable summary of the result or failure
    pub result_summary: String,
    /// Redacted request params as recorded
    pub params: serde_json::Value,
    /// When the attempt terminated
    pub timestamp: DateTime<Utc>,
}

/// Structured result returned by handler actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerResult {
    /// Handler-defined status tag (conventionally "ok")
    pub status: String,
    /// Payload for the transport layer
    pub data: serde_json::Value,
}

impl HandlerResult {
    /// Successful result with a payload.
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            status: "ok".to_string(),
            data,
        }
    }
}
