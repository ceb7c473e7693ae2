//! Configuration types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use txgate_core::{Error, IdentifierGate, Result, DEFAULT_IDENTIFIER_PATTERN};

fn default_identifier_pattern() -> String {
    DEFAULT_IDENTIFIER_PATTERN.to_string()
}

/// Engine configuration consumed at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Sandbox root directory containing handler markers. Must exist and
    /// canonicalize; validated by [`validate`](Self::validate).
    pub sandbox_root: PathBuf,

    /// Directory holding the durable store's JSON documents.
    pub data_dir: PathBuf,

    /// Audit log location. `None` disables the file sink (outcomes still
    /// flow to whatever sink the embedder wires in).
    #[serde(default)]
    pub audit_log: Option<PathBuf>,

    /// Identifier syntax enforced on resource and action names.
    #[serde(default = "default_identifier_pattern")]
    pub identifier_pattern: String,

    /// Default per-dispatch deadline in milliseconds; `None` means no
    /// deadline unless the caller supplies one.
    #[serde(default)]
    pub dispatch_deadline_ms: Option<u64>,
}

impl DispatchConfig {
    /// Configuration rooted at a single base directory, with defaults for
    /// everything else.
    pub fn rooted_at(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        Self {
            sandbox_root: base.join("handlers"),
            data_dir: base.join("data"),
            audit_log: Some(base.join(txgate_core::AUDIT_LOG_FILENAME)),
            identifier_pattern: default_identifier_pattern(),
            dispatch_deadline_ms: None,
        }
    }

    /// The default dispatch deadline as a `Duration`.
    pub fn dispatch_deadline(&self) -> Option<Duration> {
        self.dispatch_deadline_ms.map(Duration::from_millis)
    }

    /// Validate the configuration and resolve the sandbox root to its
    /// canonical form.
    pub fn validate(mut self) -> Result<Self> {
        self.sandbox_root = self.sandbox_root.canonicalize().map_err(|e| {
            Error::configuration(format!(
                "sandbox root '{}' cannot be resolved: {e}",
                self.sandbox_root.display()
            ))
        })?;
        if !self.sandbox_root.is_dir() {
            return Err(Error::configuration(format!(
                "sandbox root '{}' is not a directory",
                self.sandbox_root.display()
            )));
        }
        self.identifier_gate()?;
        Ok(self)
    }

    /// Compile the configured identifier pattern.
    pub fn identifier_gate(&self) -> Result<IdentifierGate> {
        IdentifierGate::new(&self.identifier_pattern).map_err(Error::configuration)
    }
}
