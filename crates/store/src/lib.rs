//! Durable storage for transaction definitions and permission entries.
//!
//! The dispatch core consumes storage through the [`DurableStore`] trait:
//! full-table reads at load time, an action-registry lookup used by `grant`,
//! and single-row permission writes. Two implementations are provided:
//!
//! - [`JsonStore`]: JSON documents under a data directory, written atomically
//!   (temp file + rename). Suitable for a single-process deployment unit and
//!   the swap-in point for a real database.
//! - [`MemoryStore`]: in-memory tables with failure injection, for tests.

mod json;
mod memory;
mod traits;

pub use json::JsonStore;
pub use memory::MemoryStore;
pub use traits::DurableStore;
