//! Audit sink contract and implementations.

use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use txgate_core::{DispatchOutcome, Error, Result};

/// Receives one outcome record per dispatch attempt.
///
/// Sink failures must never fail the dispatch; the dispatcher makes one
/// bounded best-effort attempt and logs the rest.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, outcome: &DispatchOutcome) -> Result<()>;
}

/// Append-only JSON lines audit log.
pub struct JsonlAuditSink {
    path: PathBuf,
    // Serializes appends so interleaved dispatches cannot tear lines.
    writer: Mutex<()>,
}

impl JsonlAuditSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditSink for JsonlAuditSink {
    async fn record(&self, outcome: &DispatchOutcome) -> Result<()> {
        let line = serde_json::to_string(outcome)?;
        let _guard = self.writer.lock().await;
        let path = self.path.clone();
        // Blocking file append kept off the async workers.
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| Error::io(&path, "open audit log", e))?;
            file.write_all(line.as_bytes())
                .and_then(|()| file.write_all(b"\n"))
                .map_err(|e| Error::io(&path, "append audit record", e))?;
            Ok(())
        })
        .await
        .map_err(|e| Error::unknown(format!("audit write task failed: {e}")))?
    }
}

/// In-memory sink for tests: retains every recorded outcome.
#[derive(Default)]
pub struct MemoryAuditSink {
    records: parking_lot::Mutex<Vec<DispatchOutcome>>,
    fail: std::sync::atomic::AtomicBool,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent records fail, for best-effort tests.
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn records(&self) -> Vec<DispatchOutcome> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, outcome: &DispatchOutcome) -> Result<()> {
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(Error::unknown("audit sink unavailable (injected)"));
        }
        self.records.lock().push(outcome.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;
    use txgate_core::DispatchStatus;

    fn outcome() -> DispatchOutcome {
        DispatchOutcome {
            request_id: "req-1".to_string(),
            profile_id: 2,
            resource: Some("Auth".to_string()),
            action: Some("register".to_string()),
            code: 101,
            status: DispatchStatus::Success,
            result_summary: "ok".to_string(),
            params: serde_json::json!({}),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn jsonl_sink_appends_one_line_per_record() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.jsonl");
        let sink = JsonlAuditSink::new(&path);

        sink.record(&outcome()).await.unwrap();
        sink.record(&outcome()).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: DispatchOutcome = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed.code, 101);
        assert_eq!(parsed.status, DispatchStatus::Success);
    }

    #[tokio::test]
    async fn memory_sink_retains_records_in_order() {
        let sink = MemoryAuditSink::new();
        let mut first = outcome();
        first.request_id = "a".to_string();
        let mut second = outcome();
        second.request_id = "b".to_string();

        sink.record(&first).await.unwrap();
        sink.record(&second).await.unwrap();

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].request_id, "a");
        assert_eq!(records[1].request_id, "b");
    }
}
