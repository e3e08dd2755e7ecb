//! In-memory audit log (non-persistent).

use super::{now_string, AuditAction, AuditEntry, AuditLog, NewAuditEntry};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct MemoryAuditLog {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Default for MemoryAuditLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditLog for MemoryAuditLog {
    fn is_persistent(&self) -> bool {
        false
    }

    async fn append(&self, entry: NewAuditEntry) -> Result<AuditEntry, String> {
        let mut entries = self.entries.lock().await;
        let stored = AuditEntry {
            id: entries.len() as i64 + 1,
            secret_key: entry.secret_key,
            action: entry.action,
            timestamp: now_string(),
            ip_address: entry.ip_address,
            ttl_seconds: entry.ttl_seconds,
            passphrase_used: entry.passphrase_used,
        };
        entries.push(stored.clone());
        Ok(stored)
    }

    async fn find_create_entry(&self, secret_key: &str) -> Result<Option<AuditEntry>, String> {
        Ok(self
            .entries
            .lock()
            .await
            .iter()
            .find(|e| e.secret_key == secret_key && e.action == AuditAction::Create)
            .cloned())
    }

    async fn entries_for_key(&self, secret_key: &str) -> Result<Vec<AuditEntry>, String> {
        Ok(self
            .entries
            .lock()
            .await
            .iter()
            .filter(|e| e.secret_key == secret_key)
            .cloned()
            .collect())
    }
}
