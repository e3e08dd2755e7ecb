//! In-memory ephemeral store (non-persistent).

use super::EphemeralStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

struct Entry {
    value: String,
    expires_at: Instant,
}

/// HashMap-backed store. The map mutex makes `take` a single indivisible
/// remove, which is all the atomicity the one-time-read guarantee needs.
#[derive(Clone)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EphemeralStore for MemoryStore {
    fn is_persistent(&self) -> bool {
        false
    }

    async fn put(&self, key: &str, value: &str, ttl_seconds: u64) {
        // Instant arithmetic panics on overflow, so an absurd TTL saturates
        // to an expiry a century out instead of taking the task down.
        let now = Instant::now();
        let expires_at = now
            .checked_add(Duration::from_secs(ttl_seconds))
            .unwrap_or_else(|| now + Duration::from_secs(60 * 60 * 24 * 365 * 100));
        let entry = Entry {
            value: value.to_string(),
            expires_at,
        };
        self.entries.lock().await.insert(key.to_string(), entry);
    }

    async fn take(&self, key: &str) -> Option<String> {
        let entry = self.entries.lock().await.remove(key)?;
        // Passively expired entries are treated as absent
        if entry.expires_at <= Instant::now() {
            return None;
        }
        Some(entry.value)
    }

    async fn sweep_expired(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        let now = Instant::now();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }
}
