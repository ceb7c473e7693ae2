//! Transaction code routing.
//!
//! [`RouteTable`] maps numeric transaction codes to `(resource, action)`
//! routes. The table is loaded in one pass from the durable store and is
//! immutable between reloads; a reload builds a complete replacement map and
//! swaps it in by `Arc` replacement, so concurrent `resolve` calls never
//! observe a partially built table.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use txgate_core::{Error, Result, Route};
use txgate_store::DurableStore;

/// Immutable-after-load mapping from transaction code to route.
pub struct RouteTable {
    store: Arc<dyn DurableStore>,
    // None until the first successful load. Readers clone the Arc and drop
    // the lock immediately; writers install a fully built replacement.
    table: RwLock<Option<Arc<HashMap<u32, Route>>>>,
}

impl RouteTable {
    /// Create a table bound to a store. The table is not ready until
    /// [`load`](Self::load) succeeds.
    pub fn new(store: Arc<dyn DurableStore>) -> Self {
        Self {
            store,
            table: RwLock::new(None),
        }
    }

    /// Load (or reload) all transaction definitions from the store.
    ///
    /// On success the new map replaces the old one atomically. On failure the
    /// error propagates and the previous state is kept: a never-loaded table
    /// stays not ready, a previously loaded table keeps serving its old
    /// snapshot. The process must not serve traffic on a table that has never
    /// loaded.
    pub async fn load(&self) -> Result<()> {
        let definitions = self.store.transaction_definitions().await?;

        let mut map = HashMap::with_capacity(definitions.len());
        for def in definitions {
            let route = def.route();
            if let Some(previous) = map.insert(def.code, route) {
                tracing::warn!(
                    code = def.code,
                    previous = %previous,
                    "duplicate transaction code in store, last definition wins"
                );
            }
        }

        let count = map.len();
        *self.table.write() = Some(Arc::new(map));
        tracing::debug!(routes = count, "route table loaded");
        Ok(())
    }

    /// Resolve a transaction code to its route.
    ///
    /// Unknown codes and resolves against a never-loaded table both return
    /// [`Error::RouteNotFound`].
    pub fn resolve(&self, code: u32) -> Result<Route> {
        let snapshot = self.table.read().clone();
        match snapshot {
            Some(table) => table
                .get(&code)
                .cloned()
                .ok_or_else(|| Error::route_not_found(code)),
            None => Err(Error::route_not_found(code)),
        }
    }

    /// Whether the table has loaded successfully at least once.
    pub fn is_ready(&self) -> bool {
        self.table.read().is_some()
    }

    /// Number of routes in the current snapshot, for diagnostics.
    pub fn len(&self) -> usize {
        self.table.read().as_ref().map_or(0, |t| t.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current snapshot of all `(code, route)` pairs, for inspection tooling.
    pub fn snapshot(&self) -> Vec<(u32, Route)> {
        match self.table.read().as_ref() {
            Some(table) => {
                let mut routes: Vec<_> =
                    table.iter().map(|(code, route)| (*code, route.clone())).collect();
                routes.sort_by_key(|(code, _)| *code);
                routes
            }
            None => Vec::new(),
        }
    }
}
