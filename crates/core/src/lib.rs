//! Core domain types, errors, and constants for the `txgate` dispatch engine.
//!
//! This crate establishes the foundational data structures and error handling
//! mechanisms used throughout the workspace.
//!
//! ## Key Components
//!
//! - **`errors`**: Defines the primary `Error` enum and `Result` type alias,
//!   centralizing the dispatch error taxonomy (route resolution, authorization,
//!   handler loading, business failures) for predictable error handling.
//! - **`types`**: Domain data structures such as `TransactionDefinition`,
//!   `PermissionEntry`, `Identity`, and `DispatchOutcome`.
//! - **`ident`**: The strict identifier syntax gate shared by the loader and
//!   the dispatcher's defensive route validation.
//! - **`redact`**: Redaction of secret-like parameter fields before audit.
//! - **`constants`**: Shared static constants (environment variable names,
//!   default file names, identifier limits).

pub mod constants;
pub mod errors;
pub mod ident;
pub mod redact;
pub mod types;

pub use self::{
    constants::*,
    errors::{Error, Result},
    ident::{is_valid_identifier, validate_identifier, IdentifierGate, DEFAULT_IDENTIFIER_PATTERN},
    redact::redact_params,
    types::*,
};
