//! SQLite-based audit log.

use super::{now_string, AuditAction, AuditEntry, AuditLog, NewAuditEntry};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

const SCHEMA: &str = r#"
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS secret_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    secret_key TEXT NOT NULL,
    action TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    ip_address TEXT NOT NULL,
    ttl_seconds INTEGER,
    passphrase_used TEXT
);

CREATE INDEX IF NOT EXISTS idx_logs_secret_key ON secret_logs(secret_key);
CREATE INDEX IF NOT EXISTS idx_logs_key_action ON secret_logs(secret_key, action);
"#;

pub struct SqliteAuditLog {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteAuditLog {
    pub async fn new(data_dir: PathBuf) -> Result<Self, String> {
        tokio::fs::create_dir_all(&data_dir)
            .await
            .map_err(|e| format!("Failed to create data dir: {}", e))?;
        let db_path = data_dir.join("audit.db");

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

fn parse_row(row: &Row<'_>) -> Result<AuditEntry, rusqlite::Error> {
    let action_str: String = row.get(2)?;
    let ttl: Option<i64> = row.get(5)?;
    Ok(AuditEntry {
        id: row.get(0)?,
        secret_key: row.get(1)?,
        // Unknown action strings cannot be inserted through this adapter
        action: AuditAction::parse(&action_str).unwrap_or(AuditAction::Create),
        timestamp: row.get(3)?,
        ip_address: row.get(4)?,
        ttl_seconds: ttl.map(|t| t as u64),
        passphrase_used: row.get(6)?,
    })
}

#[async_trait]
impl AuditLog for SqliteAuditLog {
    fn is_persistent(&self) -> bool {
        true
    }

    async fn append(&self, entry: NewAuditEntry) -> Result<AuditEntry, String> {
        let conn = self.conn.clone();
        let timestamp = now_string();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.execute(
                "INSERT INTO secret_logs (secret_key, action, timestamp, ip_address, ttl_seconds, passphrase_used)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    entry.secret_key,
                    entry.action.as_str(),
                    timestamp,
                    entry.ip_address,
                    entry.ttl_seconds.map(|t| t as i64),
                    entry.passphrase_used,
                ],
            )
            .map_err(|e| e.to_string())?;

            let id = conn.last_insert_rowid();
            Ok(AuditEntry {
                id,
                secret_key: entry.secret_key,
                action: entry.action,
                timestamp,
                ip_address: entry.ip_address,
                ttl_seconds: entry.ttl_seconds,
                passphrase_used: entry.passphrase_used,
            })
        })
        .await
        .map_err(|e| e.to_string())?
    }

    async fn find_create_entry(&self, secret_key: &str) -> Result<Option<AuditEntry>, String> {
        let conn = self.conn.clone();
        let key = secret_key.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.query_row(
                "SELECT id, secret_key, action, timestamp, ip_address, ttl_seconds, passphrase_used
                 FROM secret_logs
                 WHERE secret_key = ?1 AND action = 'create'
                 ORDER BY id ASC
                 LIMIT 1",
                params![key],
                parse_row,
            )
            .optional()
            .map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| e.to_string())?
    }

    async fn entries_for_key(&self, secret_key: &str) -> Result<Vec<AuditEntry>, String> {
        let conn = self.conn.clone();
        let key = secret_key.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let mut stmt = conn
                .prepare(
                    "SELECT id, secret_key, action, timestamp, ip_address, ttl_seconds, passphrase_used
                     FROM secret_logs
                     WHERE secret_key = ?1
                     ORDER BY id ASC",
                )
                .map_err(|e| e.to_string())?;

            let entries = stmt
                .query_map(params![key], parse_row)
                .map_err(|e| e.to_string())?
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| e.to_string())?;

            Ok(entries)
        })
        .await
        .map_err(|e| e.to_string())?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_log() -> (SqliteAuditLog, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let log = SqliteAuditLog::new(dir.path().to_path_buf()).await.unwrap();
        (log, dir)
    }

    fn entry(key: &str, action: AuditAction) -> NewAuditEntry {
        NewAuditEntry {
            secret_key: key.to_string(),
            action,
            ip_address: "192.0.2.7".to_string(),
            ttl_seconds: matches!(action, AuditAction::Create).then_some(600),
            passphrase_used: None,
        }
    }

    #[tokio::test]
    async fn test_append_and_lookup() {
        let (log, _dir) = temp_log().await;

        let created = log.append(entry("k", AuditAction::Create)).await.unwrap();
        assert_eq!(created.id, 1);
        assert_eq!(created.ttl_seconds, Some(600));

        let read = log.append(entry("k", AuditAction::Read)).await.unwrap();
        assert_eq!(read.id, 2);
        assert_eq!(read.ttl_seconds, None);

        let found = log.find_create_entry("k").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.action, AuditAction::Create);
        assert_eq!(found.ip_address, "192.0.2.7");
    }

    #[tokio::test]
    async fn test_find_create_entry_absent() {
        let (log, _dir) = temp_log().await;
        log.append(entry("k", AuditAction::Read)).await.unwrap();

        assert!(log.find_create_entry("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_passphrase_stored_verbatim() {
        let (log, _dir) = temp_log().await;
        let mut e = entry("k", AuditAction::Create);
        e.passphrase_used = Some("p@ss".to_string());
        log.append(e).await.unwrap();

        let found = log.find_create_entry("k").await.unwrap().unwrap();
        assert_eq!(found.passphrase_used.as_deref(), Some("p@ss"));
    }

    #[tokio::test]
    async fn test_trail_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let log = SqliteAuditLog::new(dir.path().to_path_buf()).await.unwrap();
            log.append(entry("k", AuditAction::Create)).await.unwrap();
            log.append(entry("k", AuditAction::Delete)).await.unwrap();
        }
        let log = SqliteAuditLog::new(dir.path().to_path_buf()).await.unwrap();
        let trail = log.entries_for_key("k").await.unwrap();
        assert_eq!(trail.len(), 2);
        assert_eq!(trail[1].action, AuditAction::Delete);
    }
}
