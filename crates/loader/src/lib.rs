//! Sandboxed handler loading and invocation.
//!
//! Handlers are not loaded dynamically from code on disk; [`HandlerRegistry`]
//! maps resource names to constructor functions registered at startup, and a
//! marker file in the sandbox root marks a resource as deployed. The security
//! discipline around the lookup is strict: names pass a syntax gate, the
//! derived handler location is canonicalized and checked for containment
//! inside the sandbox root, and any escape is treated as a potential
//! intrusion attempt rather than an ordinary validation failure.

mod handler;
mod registry;
mod sandbox;

pub use handler::{Handler, HandlerContext};
pub use registry::HandlerRegistry;
pub use sandbox::SandboxedLoader;
