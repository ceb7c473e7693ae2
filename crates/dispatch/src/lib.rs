//! Request dispatch orchestration.
//!
//! [`Dispatcher`] is the single entry point the transport layer calls. Each
//! dispatch runs a linear state machine — resolve the transaction code,
//! defensively re-validate the route, authorize against the permission
//! cache, execute through the sandboxed loader — and records exactly one
//! [`txgate_core::DispatchOutcome`] per attempt with the audit sink,
//! whichever state it terminated in.

mod audit;
mod dispatcher;

pub use audit::{AuditSink, JsonlAuditSink, MemoryAuditSink};
pub use dispatcher::Dispatcher;
