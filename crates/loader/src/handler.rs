//! Handler contract for loaded business resources.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use txgate_core::{HandlerResult, Result};

/// Dependency bundle injected into handlers at construction.
///
/// Handlers are expected to be stateless aside from what they take from
/// here. The bundle is deliberately loose (string-keyed collaborators) so
/// the loader does not need to know every handler's wiring.
#[derive(Clone, Default)]
pub struct HandlerContext {
    collaborators: HashMap<String, Arc<dyn std::any::Any + Send + Sync>>,
}

impl HandlerContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a collaborator under a well-known name.
    pub fn with(mut self, name: impl Into<String>, value: Arc<dyn std::any::Any + Send + Sync>) -> Self {
        self.collaborators.insert(name.into(), value);
        self
    }

    /// Fetch a collaborator by name and concrete type.
    pub fn get<T: Send + Sync + 'static>(&self, name: &str) -> Option<Arc<T>> {
        self.collaborators
            .get(name)
            .and_then(|any| any.clone().downcast::<T>().ok())
    }
}

impl std::fmt::Debug for HandlerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerContext")
            .field("collaborators", &self.collaborators.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A loaded business resource exposing named async actions.
///
/// Implementations return [`HandlerResult`] on success and raise
/// `Error::Business` for domain failures; anything else they raise is
/// classified by the loader as an unknown error and collapsed before it
/// crosses the sandbox boundary.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Actions this handler exposes. The loader consults this before
    /// invoking, so an unsupported action never reaches `invoke`.
    fn supported_actions(&self) -> &[&str];

    /// Invoke the named action with the request params.
    async fn invoke(&self, action: &str, params: Value) -> Result<HandlerResult>;
}
