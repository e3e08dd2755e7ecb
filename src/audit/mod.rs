//! Append-only audit log with pluggable backends.
//!
//! Supports:
//! - `memory`: In-memory log (non-persistent, for testing)
//! - `sqlite`: SQLite database (durable)
//!
//! The log is the only durable artifact of a secret's existence after
//! consumption or expiry. Entries are immutable once appended; ids and
//! timestamps are store-assigned. `passphrase_used` values are stored in
//! cleartext — an accepted scope limitation of the audit design, not
//! something adapters may silently hash or redact.

mod memory;
mod sqlite;

pub use memory::MemoryAuditLog;
pub use sqlite::SqliteAuditLog;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::StoreBackend;

/// Action recorded by an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Create,
    Read,
    Delete,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Delete => "delete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "create" => Some(Self::Create),
            "read" => Some(Self::Read),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored audit entry with assigned id and timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    /// Key of the referenced secret. The secret itself may already be gone.
    pub secret_key: String,
    pub action: AuditAction,
    /// RFC3339, store-assigned at append time.
    pub timestamp: String,
    pub ip_address: String,
    /// Populated only for `create`.
    pub ttl_seconds: Option<u64>,
    /// The secret's passphrase on `create`, the caller-supplied passphrase on
    /// `delete`, `None` on `read`.
    pub passphrase_used: Option<String>,
}

/// An entry as submitted by the lifecycle service, before id/timestamp
/// assignment.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub secret_key: String,
    pub action: AuditAction,
    pub ip_address: String,
    pub ttl_seconds: Option<u64>,
    pub passphrase_used: Option<String>,
}

/// Get current timestamp as RFC3339 string.
pub fn now_string() -> String {
    Utc::now().to_rfc3339()
}

/// Audit log trait - implemented by all storage backends.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Whether this log persists data across restarts.
    fn is_persistent(&self) -> bool;

    /// Append an entry, returning it with assigned id and timestamp.
    async fn append(&self, entry: NewAuditEntry) -> Result<AuditEntry, String>;

    /// Find the `create` entry for a secret key, if any.
    ///
    /// Correct lifecycle use produces at most one such entry per key; if
    /// several exist the lowest-id one is returned.
    async fn find_create_entry(&self, secret_key: &str) -> Result<Option<AuditEntry>, String>;

    /// All entries for a secret key, ordered by id.
    async fn entries_for_key(&self, secret_key: &str) -> Result<Vec<AuditEntry>, String>;
}

/// Create an audit log based on the configured backend.
pub async fn create_audit_log(
    backend: StoreBackend,
    data_dir: PathBuf,
) -> Result<Arc<dyn AuditLog>, String> {
    match backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryAuditLog::new())),
        StoreBackend::Sqlite => {
            let log = SqliteAuditLog::new(data_dir).await?;
            Ok(Arc::new(log))
        }
    }
}
