use async_trait::async_trait;
use txgate_core::{PermissionEntry, Result, TransactionDefinition};

/// Durable store consumed by the route table and the permission cache.
///
/// Implementations must be safe for concurrent use; the permission cache
/// serializes its own grant/revoke sequences, but reads may arrive from any
/// task at any time.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// All transaction definitions, for `RouteTable::load`.
    async fn transaction_definitions(&self) -> Result<Vec<TransactionDefinition>>;

    /// All permission entries, for `PermissionCache::load`.
    async fn permission_entries(&self) -> Result<Vec<PermissionEntry>>;

    /// Resolve a `(resource, action)` pair to its internal action identifier.
    ///
    /// Returns `None` when the pair is not registered; `grant` treats that as
    /// a refusal, not an error.
    async fn resolve_action_id(&self, resource: &str, action: &str) -> Result<Option<u64>>;

    /// Insert one permission row. The row must be durably committed when this
    /// returns `Ok`.
    async fn insert_permission(&self, profile_id: u32, action_id: u64) -> Result<()>;

    /// Delete one permission row. Returns `true` iff at least one row was
    /// removed.
    async fn delete_permission(&self, profile_id: u32, action_id: u64) -> Result<bool>;
}
