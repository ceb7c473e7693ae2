//! Startup-time registry mapping resource names to handler constructors.

use crate::handler::{Handler, HandlerContext};
use std::collections::HashMap;
use std::sync::Arc;
use txgate_core::{Error, Result};

type HandlerConstructor =
    Box<dyn Fn(&HandlerContext) -> Result<Arc<dyn Handler>> + Send + Sync>;

/// Map from resource name to constructor function.
///
/// Populated once at startup, read-only afterwards. This is the safe
/// replacement for runtime module loading: a resource that was never
/// registered simply cannot be constructed, whatever its on-disk marker
/// says.
#[derive(Default)]
pub struct HandlerRegistry {
    constructors: HashMap<String, HandlerConstructor>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor for a resource name. Replaces any previous
    /// registration for the same name.
    pub fn register<F>(&mut self, resource: impl Into<String>, constructor: F)
    where
        F: Fn(&HandlerContext) -> Result<Arc<dyn Handler>> + Send + Sync + 'static,
    {
        let resource = resource.into();
        if self.constructors.insert(resource.clone(), Box::new(constructor)).is_some() {
            tracing::warn!(resource, "handler constructor replaced");
        }
    }

    /// Whether a constructor is registered for `resource`.
    pub fn contains(&self, resource: &str) -> bool {
        self.constructors.contains_key(resource)
    }

    /// Registered resource names, for diagnostics.
    pub fn resources(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Construct a handler instance for `resource`.
    pub fn construct(&self, resource: &str, ctx: &HandlerContext) -> Result<Arc<dyn Handler>> {
        let constructor = self
            .constructors
            .get(resource)
            .ok_or_else(|| Error::load(resource, "no handler registered"))?;
        constructor(ctx)
            .map_err(|e| Error::load(resource, format!("constructor failed: {e}")))
    }
}
