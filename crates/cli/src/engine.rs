//! Assembly of the dispatch engine from configuration.

use std::path::PathBuf;
use std::sync::Arc;
use txgate_config::{ConfigLoader, DispatchConfig};
use txgate_core::Result;
use txgate_dispatch::{AuditSink, Dispatcher, JsonlAuditSink, MemoryAuditSink};
use txgate_loader::{HandlerContext, HandlerRegistry, SandboxedLoader};
use txgate_permissions::PermissionCache;
use txgate_routes::RouteTable;
use txgate_store::JsonStore;

/// A fully wired engine for one CLI invocation.
pub struct Engine {
    pub config: DispatchConfig,
    pub routes: Arc<RouteTable>,
    pub permissions: Arc<PermissionCache>,
    pub dispatcher: Dispatcher,
}

impl Engine {
    /// Load configuration and bring both lookup structures up.
    ///
    /// The stock binary registers no business handlers; `dispatch` runs the
    /// full pipeline and reports where it terminated, which makes it a
    /// routing/authorization preflight on a live data directory.
    pub async fn bring_up(config_file: Option<PathBuf>) -> Result<Self> {
        let mut loader = ConfigLoader::new();
        if let Some(file) = config_file {
            loader = loader.file(file);
        }
        let config = loader.load().await?;

        let store = Arc::new(JsonStore::new(&config.data_dir));
        let routes = Arc::new(RouteTable::new(store.clone()));
        routes.load().await?;
        let permissions = Arc::new(PermissionCache::new(store.clone()));
        permissions.load().await?;

        // One compiled gate shared by the dispatcher's route check and the
        // loader, so a configured pattern applies uniformly.
        let gate = config.identifier_gate()?;
        let sandbox = SandboxedLoader::new(
            &config.sandbox_root,
            HandlerRegistry::new(),
            HandlerContext::new(),
        )?
        .with_identifier_gate(gate.clone());

        let audit: Arc<dyn AuditSink> = match &config.audit_log {
            Some(path) => Arc::new(JsonlAuditSink::new(path)),
            None => Arc::new(MemoryAuditSink::new()),
        };

        let dispatcher = Dispatcher::new(
            routes.clone(),
            permissions.clone(),
            Arc::new(sandbox),
            audit,
        )
        .with_identifier_gate(gate);

        Ok(Self {
            config,
            routes,
            permissions,
            dispatcher,
        })
    }
}
