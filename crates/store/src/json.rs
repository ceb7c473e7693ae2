//! JSON file-backed durable store.

use crate::traits::DurableStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use txgate_core::{Error, PermissionEntry, Result, TransactionDefinition};

const TRANSACTIONS_FILE: &str = "transactions.json";
const ACTIONS_FILE: &str = "actions.json";
const PERMISSIONS_FILE: &str = "permissions.json";

/// One row of the action registry: an internal identifier for a
/// `(resource, action)` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ActionRow {
    id: u64,
    resource: String,
    action: String,
}

/// One permission row, referencing the action registry by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct PermissionRow {
    profile_id: u32,
    action_id: u64,
}

/// Durable store backed by JSON documents under a data directory.
///
/// `transactions.json` and `actions.json` are required and read-only at
/// runtime; `permissions.json` defaults to empty and is rewritten atomically
/// on every permission mutation. A single mutex serializes mutations so
/// concurrent grant/revoke sequences cannot interleave read-modify-write
/// cycles.
pub struct JsonStore {
    data_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn path(&self, file: &str) -> PathBuf {
        self.data_dir.join(file)
    }

    async fn read_required<T: for<'de> Deserialize<'de>>(&self, file: &str) -> Result<T> {
        let path = self.path(file);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| Error::store_with_source("read", format!("cannot read '{file}'"), e))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| Error::store_with_source("read", format!("cannot parse '{file}'"), e))
    }

    async fn read_permissions(&self) -> Result<Vec<PermissionRow>> {
        let path = self.path(PERMISSIONS_FILE);
        match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                Error::store_with_source("read", format!("cannot parse '{PERMISSIONS_FILE}'"), e)
            }),
            // A fresh deployment has no permission rows yet.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(Error::store_with_source(
                "read",
                format!("cannot read '{PERMISSIONS_FILE}'"),
                e,
            )),
        }
    }

    async fn write_permissions(&self, rows: &[PermissionRow]) -> Result<()> {
        let content = serde_json::to_vec_pretty(rows)?;
        write_atomic(&self.path(PERMISSIONS_FILE), &content).await
    }
}

/// Write data to a file atomically by writing to a temporary file in the same
/// directory, syncing it, and renaming over the target.
async fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| Error::configuration("invalid store path: no parent directory"))?;

    tokio::fs::create_dir_all(parent)
        .await
        .map_err(|e| Error::io(parent, "create data directory", e))?;

    let temp_path = parent.join(format!(".{}.tmp", uuid::Uuid::new_v4()));

    let result = async {
        let mut file = tokio::fs::File::create(&temp_path)
            .await
            .map_err(|e| Error::io(&temp_path, "create temporary file", e))?;
        file.write_all(content)
            .await
            .map_err(|e| Error::io(&temp_path, "write temporary file", e))?;
        file.sync_all()
            .await
            .map_err(|e| Error::io(&temp_path, "sync temporary file", e))?;
        Ok(())
    }
    .await;

    if let Err(e) = result {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e);
    }

    if let Err(e) = tokio::fs::rename(&temp_path, path).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(Error::io(path, "atomic rename", e));
    }
    Ok(())
}

#[async_trait]
impl DurableStore for JsonStore {
    async fn transaction_definitions(&self) -> Result<Vec<TransactionDefinition>> {
        self.read_required(TRANSACTIONS_FILE).await
    }

    async fn permission_entries(&self) -> Result<Vec<PermissionEntry>> {
        let actions: Vec<ActionRow> = self.read_required(ACTIONS_FILE).await?;
        let rows = self.read_permissions().await?;

        // Rows referencing unknown action ids are tolerated but skipped; they
        // can never match a check anyway.
        let entries = rows
            .iter()
            .filter_map(|row| {
                let found = actions.iter().find(|a| a.id == row.action_id);
                if found.is_none() {
                    tracing::warn!(
                        action_id = row.action_id,
                        profile_id = row.profile_id,
                        "permission row references unknown action id, skipping"
                    );
                }
                found.map(|a| PermissionEntry {
                    profile_id: row.profile_id,
                    resource: a.resource.clone(),
                    action: a.action.clone(),
                })
            })
            .collect();
        Ok(entries)
    }

    async fn resolve_action_id(&self, resource: &str, action: &str) -> Result<Option<u64>> {
        let actions: Vec<ActionRow> = self.read_required(ACTIONS_FILE).await?;
        Ok(actions
            .iter()
            .find(|a| a.resource == resource && a.action == action)
            .map(|a| a.id))
    }

    async fn insert_permission(&self, profile_id: u32, action_id: u64) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut rows = self.read_permissions().await?;
        let row = PermissionRow {
            profile_id,
            action_id,
        };
        // Duplicate grants are idempotent at the store level.
        if !rows.contains(&row) {
            rows.push(row);
            self.write_permissions(&rows).await?;
        }
        Ok(())
    }

    async fn delete_permission(&self, profile_id: u32, action_id: u64) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut rows = self.read_permissions().await?;
        let before = rows.len();
        rows.retain(|r| !(r.profile_id == profile_id && r.action_id == action_id));
        let removed = rows.len() != before;
        if removed {
            self.write_permissions(&rows).await?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn seed_store(dir: &TempDir) -> JsonStore {
        let transactions = serde_json::json!([
            { "code": 101, "resource": "Auth", "action": "register" },
            { "code": 102, "resource": "Auth", "action": "login" },
        ]);
        let actions = serde_json::json!([
            { "id": 1, "resource": "Auth", "action": "register" },
            { "id": 2, "resource": "Auth", "action": "login" },
        ]);
        tokio::fs::write(
            dir.path().join(TRANSACTIONS_FILE),
            transactions.to_string(),
        )
        .await
        .unwrap();
        tokio::fs::write(dir.path().join(ACTIONS_FILE), actions.to_string())
            .await
            .unwrap();
        JsonStore::new(dir.path())
    }

    #[tokio::test]
    async fn reads_transaction_definitions() {
        let dir = TempDir::new().unwrap();
        let store = seed_store(&dir).await;
        let defs = store.transaction_definitions().await.unwrap();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].code, 101);
        assert_eq!(defs[0].resource, "Auth");
    }

    #[tokio::test]
    async fn missing_transactions_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path());
        assert!(store.transaction_definitions().await.is_err());
    }

    #[tokio::test]
    async fn missing_permissions_file_reads_empty() {
        let dir = TempDir::new().unwrap();
        let store = seed_store(&dir).await;
        assert!(store.permission_entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn insert_and_delete_permission_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = seed_store(&dir).await;

        store.insert_permission(2, 1).await.unwrap();
        let entries = store.permission_entries().await.unwrap();
        assert_eq!(
            entries,
            vec![PermissionEntry {
                profile_id: 2,
                resource: "Auth".to_string(),
                action: "register".to_string(),
            }]
        );

        assert!(store.delete_permission(2, 1).await.unwrap());
        assert!(store.permission_entries().await.unwrap().is_empty());
        // Second delete affects nothing.
        assert!(!store.delete_permission(2, 1).await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_insert_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = seed_store(&dir).await;
        store.insert_permission(2, 1).await.unwrap();
        store.insert_permission(2, 1).await.unwrap();
        assert_eq!(store.permission_entries().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn resolves_registered_actions_only() {
        let dir = TempDir::new().unwrap();
        let store = seed_store(&dir).await;
        assert_eq!(store.resolve_action_id("Auth", "login").await.unwrap(), Some(2));
        assert_eq!(store.resolve_action_id("Auth", "delete").await.unwrap(), None);
        assert_eq!(store.resolve_action_id("Billing", "pay").await.unwrap(), None);
    }

    #[tokio::test]
    async fn permission_rows_with_unknown_action_ids_are_skipped() {
        let dir = TempDir::new().unwrap();
        let store = seed_store(&dir).await;
        tokio::fs::write(
            dir.path().join(PERMISSIONS_FILE),
            serde_json::json!([
                { "profile_id": 2, "action_id": 1 },
                { "profile_id": 2, "action_id": 999 },
            ])
            .to_string(),
        )
        .await
        .unwrap();
        let entries = store.permission_entries().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, "register");
    }
}
