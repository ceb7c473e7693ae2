//! In-memory durable store for tests and examples.

use crate::traits::DurableStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use txgate_core::{Error, PermissionEntry, Result, TransactionDefinition};

#[derive(Debug, Clone, PartialEq, Eq)]
struct ActionRow {
    id: u64,
    resource: String,
    action: String,
}

/// In-memory store with failure injection.
///
/// Not durable, of course; it exists so load-failure and dual-write paths can
/// be exercised without touching the filesystem.
#[derive(Default)]
pub struct MemoryStore {
    transactions: RwLock<Vec<TransactionDefinition>>,
    actions: RwLock<Vec<ActionRow>>,
    permissions: RwLock<Vec<(u32, u64)>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transaction definition and, implicitly, its action.
    pub fn add_transaction(&self, code: u32, resource: &str, action: &str) {
        self.transactions.write().push(TransactionDefinition {
            code,
            resource: resource.to_string(),
            action: action.to_string(),
        });
        self.add_action(resource, action);
    }

    /// Register an action without binding a transaction code to it.
    pub fn add_action(&self, resource: &str, action: &str) -> u64 {
        let mut actions = self.actions.write();
        if let Some(existing) = actions
            .iter()
            .find(|a| a.resource == resource && a.action == action)
        {
            return existing.id;
        }
        let id = actions.len() as u64 + 1;
        actions.push(ActionRow {
            id,
            resource: resource.to_string(),
            action: action.to_string(),
        });
        id
    }

    /// Seed a permission row directly, bypassing the grant path.
    pub fn add_permission(&self, profile_id: u32, resource: &str, action: &str) {
        let id = self.add_action(resource, action);
        self.permissions.write().push((profile_id, id));
    }

    /// Make subsequent reads fail, simulating an unreachable store.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent writes fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of permission rows currently held.
    pub fn permission_row_count(&self) -> usize {
        self.permissions.read().len()
    }

    fn check_read(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::store("read", "store unreachable (injected)"));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::store("write", "store unreachable (injected)"));
        }
        Ok(())
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn transaction_definitions(&self) -> Result<Vec<TransactionDefinition>> {
        self.check_read()?;
        Ok(self.transactions.read().clone())
    }

    async fn permission_entries(&self) -> Result<Vec<PermissionEntry>> {
        self.check_read()?;
        let actions = self.actions.read();
        let entries = self
            .permissions
            .read()
            .iter()
            .filter_map(|(profile_id, action_id)| {
                actions.iter().find(|a| a.id == *action_id).map(|a| PermissionEntry {
                    profile_id: *profile_id,
                    resource: a.resource.clone(),
                    action: a.action.clone(),
                })
            })
            .collect();
        Ok(entries)
    }

    async fn resolve_action_id(&self, resource: &str, action: &str) -> Result<Option<u64>> {
        self.check_read()?;
        Ok(self
            .actions
            .read()
            .iter()
            .find(|a| a.resource == resource && a.action == action)
            .map(|a| a.id))
    }

    async fn insert_permission(&self, profile_id: u32, action_id: u64) -> Result<()> {
        self.check_write()?;
        let mut permissions = self.permissions.write();
        if !permissions.contains(&(profile_id, action_id)) {
            permissions.push((profile_id, action_id));
        }
        Ok(())
    }

    async fn delete_permission(&self, profile_id: u32, action_id: u64) -> Result<bool> {
        self.check_write()?;
        let mut permissions = self.permissions.write();
        let before = permissions.len();
        permissions.retain(|row| *row != (profile_id, action_id));
        Ok(permissions.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeded_permissions_are_visible() {
        let store = MemoryStore::new();
        store.add_transaction(101, "Auth", "register");
        store.add_permission(2, "Auth", "register");

        let entries = store.permission_entries().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].profile_id, 2);
    }

    #[tokio::test]
    async fn injected_read_failure_surfaces() {
        let store = MemoryStore::new();
        store.fail_reads(true);
        assert!(store.transaction_definitions().await.is_err());
        store.fail_reads(false);
        assert!(store.transaction_definitions().await.is_ok());
    }

    #[tokio::test]
    async fn action_ids_are_stable_per_pair() {
        let store = MemoryStore::new();
        let a = store.add_action("Auth", "register");
        let b = store.add_action("Auth", "register");
        assert_eq!(a, b);
        let c = store.add_action("Auth", "login");
        assert_ne!(a, c);
    }
}
