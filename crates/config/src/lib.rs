//! Configuration for the txgate dispatch engine.
//!
//! Configuration comes from three layers, later layers overriding earlier
//! ones: built-in defaults, an optional `txgate.json` file, and `TXGATE_*`
//! environment variables. [`ConfigLoader`] handles discovery and validation
//! at startup.

mod config;
mod loader;

pub use config::DispatchConfig;
pub use loader::ConfigLoader;
