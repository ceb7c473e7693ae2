//! Configuration discovery and loading.

use crate::config::DispatchConfig;
use std::path::PathBuf;
use txgate_core::{
    Error, Result, CONFIG_FILENAME, TXGATE_AUDIT_LOG_VAR, TXGATE_CONFIG_VAR, TXGATE_DATA_DIR_VAR,
    TXGATE_SANDBOX_ROOT_VAR,
};

/// Loads `DispatchConfig` from file and environment at startup.
pub struct ConfigLoader {
    /// Explicit config file path; otherwise `$TXGATE_CONFIG`, then
    /// `./txgate.json`.
    file: Option<PathBuf>,
    /// Whether `TXGATE_*` variables override file values.
    apply_env: bool,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            file: None,
            apply_env: true,
        }
    }

    /// Load from a specific file instead of discovering one.
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Disable environment overrides (tests mostly).
    pub fn without_env(mut self) -> Self {
        self.apply_env = false;
        self
    }

    /// Load and validate the configuration.
    pub async fn load(self) -> Result<DispatchConfig> {
        let path = match self.file {
            Some(path) => path,
            None => match std::env::var(TXGATE_CONFIG_VAR) {
                Ok(path) => PathBuf::from(path),
                Err(_) => PathBuf::from(CONFIG_FILENAME),
            },
        };

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| Error::io(&path, "read configuration", e))?;
        let mut config: DispatchConfig = serde_json::from_slice(&bytes)
            .map_err(|e| Error::configuration(format!("cannot parse '{}': {e}", path.display())))?;

        if self.apply_env {
            if let Ok(root) = std::env::var(TXGATE_SANDBOX_ROOT_VAR) {
                config.sandbox_root = PathBuf::from(root);
            }
            if let Ok(dir) = std::env::var(TXGATE_DATA_DIR_VAR) {
                config.data_dir = PathBuf::from(dir);
            }
            if let Ok(log) = std::env::var(TXGATE_AUDIT_LOG_VAR) {
                config.audit_log = Some(PathBuf::from(log));
            }
        }

        let config = config.validate()?;
        tracing::debug!(
            sandbox_root = %config.sandbox_root.display(),
            data_dir = %config.data_dir.display(),
            "configuration loaded"
        );
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
