//! Ephemeral secret storage with pluggable backends.
//!
//! Supports:
//! - `memory`: In-memory storage (non-persistent, default)
//! - `sqlite`: SQLite database (survives restarts)
//!
//! The store is the sole source of truth for secret existence. Its one
//! correctness-critical operation is [`EphemeralStore::take`]: an atomic
//! read-and-remove, so that under concurrent callers racing on the same key
//! exactly one observes the value. Entries expire at `put time + ttl`;
//! expired entries are indistinguishable from absent ones whether they were
//! swept or merely aged out.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::StoreBackend;

/// Key-value store with per-entry expiry and an atomic read-and-remove.
///
/// Backend failures never propagate: `put` is best-effort (a secret that
/// fails to store is a secret that never existed), and a failed `take` acts
/// as absent, never as stale or duplicate data. Adapters log a warning on
/// swallowed failures so outages stay observable.
#[async_trait]
pub trait EphemeralStore: Send + Sync {
    /// Whether this store persists data across restarts.
    fn is_persistent(&self) -> bool;

    /// Store a value, overwriting any existing value at `key`, expiring
    /// `ttl_seconds` from now.
    async fn put(&self, key: &str, value: &str, ttl_seconds: u64);

    /// Atomically read and remove the value at `key`.
    ///
    /// Returns `None` if the key is absent, expired, or already consumed.
    /// Exactly one of any set of concurrent callers receives `Some`.
    async fn take(&self, key: &str) -> Option<String>;

    /// Actively remove expired entries, returning how many were dropped.
    async fn sweep_expired(&self) -> usize;
}

/// Create an ephemeral store based on the configured backend.
pub async fn create_store(
    backend: StoreBackend,
    data_dir: PathBuf,
) -> Result<Arc<dyn EphemeralStore>, String> {
    match backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreBackend::Sqlite => {
            let store = SqliteStore::new(data_dir).await?;
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The one-time-read property at the store layer: N racers on one key,
    /// exactly one take succeeds.
    #[tokio::test]
    async fn test_take_is_single_consumer() {
        let store = Arc::new(MemoryStore::new());
        store.put("k", "v", 300).await;

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move { store.take("k").await }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1, "exactly one racer should observe the value");
    }

    #[tokio::test]
    async fn test_take_absent_key() {
        let store = MemoryStore::new();
        assert_eq!(store.take("missing").await, None);
        // Absence is stable under repetition
        assert_eq!(store.take("missing").await, None);
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let store = MemoryStore::new();
        store.put("k", "first", 300).await;
        store.put("k", "second", 300).await;
        assert_eq!(store.take("k").await.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_zero_ttl_is_immediately_expired() {
        let store = MemoryStore::new();
        store.put("k", "v", 0).await;
        assert_eq!(store.take("k").await, None);
    }

    /// A maximal TTL must neither panic nor land in the past.
    #[tokio::test]
    async fn test_huge_ttl_saturates() {
        let store = MemoryStore::new();
        store.put("k", "v", u64::MAX).await;
        assert_eq!(store.take("k").await.as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_entry_expires_after_ttl() {
        let store = MemoryStore::new();
        store.put("k", "v", 1).await;
        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
        assert_eq!(store.take("k").await, None);
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let store = MemoryStore::new();
        store.put("dead", "v", 0).await;
        store.put("live", "v", 300).await;

        assert_eq!(store.sweep_expired().await, 1);
        assert_eq!(store.take("live").await.as_deref(), Some("v"));
    }
}
