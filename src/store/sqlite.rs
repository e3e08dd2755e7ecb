//! SQLite-based ephemeral store.
//!
//! All access goes through one connection behind a mutex, so a `take` (the
//! read and the delete) executes as one critical section relative to every
//! other caller.

use super::EphemeralStore;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

const SCHEMA: &str = r#"
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS secrets (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL,
    expires_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_secrets_expires_at ON secrets(expires_at);
"#;

pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub async fn new(data_dir: PathBuf) -> Result<Self, String> {
        tokio::fs::create_dir_all(&data_dir)
            .await
            .map_err(|e| format!("Failed to create data dir: {}", e))?;
        let db_path = data_dir.join("secrets.db");

        let conn = tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)
                .map_err(|e| format!("Failed to open SQLite database: {}", e))?;
            conn.execute_batch(SCHEMA)
                .map_err(|e| format!("Failed to run schema: {}", e))?;
            Ok::<_, String>(conn)
        })
        .await
        .map_err(|e| format!("Task join error: {}", e))??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

#[async_trait]
impl EphemeralStore for SqliteStore {
    fn is_persistent(&self) -> bool {
        true
    }

    async fn put(&self, key: &str, value: &str, ttl_seconds: u64) {
        let conn = self.conn.clone();
        let key = key.to_string();
        let value = value.to_string();
        // A TTL past i64 range saturates rather than wrapping into the past.
        let expires_at = Utc::now()
            .timestamp()
            .saturating_add(i64::try_from(ttl_seconds).unwrap_or(i64::MAX));

        let result = tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.execute(
                "INSERT OR REPLACE INTO secrets (key, value, expires_at) VALUES (?1, ?2, ?3)",
                params![key, value, expires_at],
            )
            .map_err(|e| e.to_string())?;
            Ok::<_, String>(())
        })
        .await
        .map_err(|e| e.to_string())
        .and_then(|r| r);

        // Best-effort: a secret that fails to store is a secret that never
        // existed. Keep the failure observable.
        if let Err(e) = result {
            tracing::warn!("Ephemeral store put failed, secret will be unretrievable: {}", e);
        }
    }

    async fn take(&self, key: &str) -> Option<String> {
        let conn = self.conn.clone();
        let key = key.to_string();
        let now = Utc::now().timestamp();

        let result = tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();

            let value: Option<String> = conn
                .query_row(
                    "SELECT value FROM secrets WHERE key = ?1 AND expires_at > ?2",
                    params![&key, now],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| e.to_string())?;

            // Remove unconditionally: a consumed or expired row is gone either
            // way. Still under the same lock as the read above.
            conn.execute("DELETE FROM secrets WHERE key = ?1", params![&key])
                .map_err(|e| e.to_string())?;

            Ok::<_, String>(value)
        })
        .await
        .map_err(|e| e.to_string())
        .and_then(|r| r);

        match result {
            Ok(value) => value,
            Err(e) => {
                // A failed take acts as absent, never as stale data
                tracing::warn!("Ephemeral store take failed, treating as absent: {}", e);
                None
            }
        }
    }

    async fn sweep_expired(&self) -> usize {
        let conn = self.conn.clone();
        let now = Utc::now().timestamp();

        let result = tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.execute("DELETE FROM secrets WHERE expires_at <= ?1", params![now])
                .map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| e.to_string())
        .and_then(|r| r);

        match result {
            Ok(swept) => swept,
            Err(e) => {
                tracing::warn!("Expiry sweep failed: {}", e);
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_store() -> (SqliteStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().to_path_buf()).await.unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn test_put_take_roundtrip() {
        let (store, _dir) = temp_store().await;
        store.put("k", "ciphertext", 300).await;

        assert_eq!(store.take("k").await.as_deref(), Some("ciphertext"));
        // Consumed on first take
        assert_eq!(store.take("k").await, None);
    }

    #[tokio::test]
    async fn test_expired_row_unavailable() {
        let (store, _dir) = temp_store().await;
        store.put("k", "v", 0).await;
        assert_eq!(store.take("k").await, None);
    }

    /// A maximal TTL saturates instead of wrapping into an expired row.
    #[tokio::test]
    async fn test_huge_ttl_saturates() {
        let (store, _dir) = temp_store().await;
        store.put("k", "v", u64::MAX).await;
        assert_eq!(store.take("k").await.as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_sweep_expired_rows() {
        let (store, _dir) = temp_store().await;
        store.put("dead", "v", 0).await;
        store.put("live", "v", 300).await;

        assert_eq!(store.sweep_expired().await, 1);
        assert_eq!(store.take("live").await.as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = SqliteStore::new(dir.path().to_path_buf()).await.unwrap();
            store.put("k", "v", 300).await;
        }
        let store = SqliteStore::new(dir.path().to_path_buf()).await.unwrap();
        assert!(store.is_persistent());
        assert_eq!(store.take("k").await.as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_concurrent_take_single_winner() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::new(dir.path().to_path_buf()).await.unwrap());
        store.put("k", "v", 300).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move { store.take("k").await }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
    }
}
