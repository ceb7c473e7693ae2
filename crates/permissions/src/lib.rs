//! In-memory permission cache with durable dual writes.
//!
//! [`PermissionCache`] holds the set of authorized
//! `(profile, resource, action)` triples as composite keys. Reads are plain
//! membership tests and never block on writers. Mutations follow a
//! store-then-cache discipline: the durable row is written first and the
//! in-memory key only changes after the store acknowledges, so the cache can
//! never claim a grant that is not durably persisted. The window where a
//! just-committed grant is not yet visible in the cache fails closed and is
//! acceptable.
//!
//! The cache is authoritative only within the process that holds it.
//! Horizontally scaled instances each load their own copy at startup and
//! drift after runtime grants/revokes; adding an invalidation channel is a
//! deployment-time decision.

use dashmap::DashSet;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use txgate_core::Result;
use txgate_store::DurableStore;

fn composite_key(profile_id: u32, resource: &str, action: &str) -> String {
    format!("{profile_id}:{resource}:{action}")
}

/// Mutable set of authorized triples, synchronized with the durable store.
pub struct PermissionCache {
    store: Arc<dyn DurableStore>,
    // DashSet handles concurrent insert/remove/contains through shared
    // references; the outer RwLock only exists so `load` can swap in a
    // freshly built set wholesale instead of mutating the live one in place.
    keys: RwLock<Arc<DashSet<String>>>,
    ready: AtomicBool,
    // Serializes grant/revoke dual writes; check never takes this.
    writer: Mutex<()>,
}

impl PermissionCache {
    /// Create a cache bound to a store. Not ready until [`load`](Self::load)
    /// succeeds; until then every `check` is `false`.
    pub fn new(store: Arc<dyn DurableStore>) -> Self {
        Self {
            store,
            keys: RwLock::new(Arc::new(DashSet::new())),
            ready: AtomicBool::new(false),
            writer: Mutex::new(()),
        }
    }

    fn current_keys(&self) -> Arc<DashSet<String>> {
        self.keys.read().clone()
    }

    /// Populate the cache from all permission entries in the store.
    ///
    /// Builds a complete replacement set and swaps it in; failure leaves the
    /// previous state (and readiness) untouched and propagates the error.
    /// Holds the writer lock across the read and the swap, so a grant or
    /// revoke that commits mid-load cannot be clobbered by a snapshot taken
    /// before it.
    pub async fn load(&self) -> Result<()> {
        let _guard = self.writer.lock().await;
        let entries = self.store.permission_entries().await?;

        let set = DashSet::with_capacity(entries.len());
        for entry in &entries {
            set.insert(composite_key(entry.profile_id, &entry.resource, &entry.action));
        }

        *self.keys.write() = Arc::new(set);
        self.ready.store(true, Ordering::SeqCst);
        tracing::debug!(permissions = entries.len(), "permission cache loaded");
        Ok(())
    }

    /// Pure membership test. `false` when the cache has never loaded.
    pub fn check(&self, profile_id: u32, resource: &str, action: &str) -> bool {
        if !self.ready.load(Ordering::SeqCst) {
            return false;
        }
        self.current_keys()
            .contains(&composite_key(profile_id, resource, action))
    }

    /// Whether the cache has loaded successfully at least once.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Grant `(resource, action)` to a profile.
    ///
    /// Resolves the pair in the store's action registry first; an
    /// unregistered pair returns `Ok(false)` without mutating the store or
    /// the cache. Otherwise the durable row is inserted and, only after the
    /// insert is acknowledged, the composite key is added to the in-memory
    /// set. `Ok(true)` iff both steps succeed.
    pub async fn grant(&self, profile_id: u32, resource: &str, action: &str) -> Result<bool> {
        let _guard = self.writer.lock().await;

        let Some(action_id) = self.store.resolve_action_id(resource, action).await? else {
            tracing::debug!(resource, action, "grant refused: action not registered");
            return Ok(false);
        };

        self.store.insert_permission(profile_id, action_id).await?;
        self.current_keys()
            .insert(composite_key(profile_id, resource, action));
        tracing::debug!(profile_id, resource, action, "permission granted");
        Ok(true)
    }

    /// Revoke `(resource, action)` from a profile.
    ///
    /// Deletes the durable row and removes the composite key after the
    /// delete is acknowledged. Returns `Ok(true)` iff the delete affected at
    /// least one row. The cache key is removed even when the store had no
    /// row, so a drifted in-memory entry cannot outlive its durable row.
    pub async fn revoke(&self, profile_id: u32, resource: &str, action: &str) -> Result<bool> {
        let _guard = self.writer.lock().await;

        let removed = match self.store.resolve_action_id(resource, action).await? {
            Some(action_id) => self.store.delete_permission(profile_id, action_id).await?,
            None => false,
        };

        self.current_keys()
            .remove(&composite_key(profile_id, resource, action));
        tracing::debug!(profile_id, resource, action, removed, "permission revoked");
        Ok(removed)
    }

    /// Number of cached keys, for diagnostics.
    pub fn len(&self) -> usize {
        self.current_keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
