//! Secret lifecycle service.
//!
//! Orchestrates the crypto envelope, ephemeral store, and audit log to
//! implement create / retrieve-once / delete. Each secret has a two-state
//! lifecycle: live (present in the store, readable exactly once) then gone
//! (consumed, expired, or deleted). There is no update and no resurrection.
//!
//! All cross-request coordination is delegated to the store's atomic take;
//! the service holds no locks of its own across I/O.

use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use crate::audit::{AuditAction, AuditLog, NewAuditEntry};
use crate::crypto::CryptoEnvelope;
use crate::error::SecretError;
use crate::store::EphemeralStore;

pub struct SecretService {
    crypto: CryptoEnvelope,
    store: Arc<dyn EphemeralStore>,
    audit: Arc<dyn AuditLog>,
    min_ttl_seconds: u64,
}

impl SecretService {
    pub fn new(
        crypto: CryptoEnvelope,
        store: Arc<dyn EphemeralStore>,
        audit: Arc<dyn AuditLog>,
        min_ttl_seconds: u64,
    ) -> Self {
        Self {
            crypto,
            store,
            audit,
            min_ttl_seconds,
        }
    }

    /// Create a secret, returning its key.
    ///
    /// The requested TTL is silently raised to the configured floor, never
    /// rejected. The store write is not rolled back if the audit append
    /// fails; the audit trail is at-least-once, not transactional.
    pub async fn create_secret(
        &self,
        plaintext: &str,
        passphrase: Option<String>,
        ttl_seconds: u64,
        ip_address: &str,
    ) -> Result<Uuid, SecretError> {
        let ttl = ttl_seconds.max(self.min_ttl_seconds);
        let key = Uuid::new_v4();
        let ciphertext = self.crypto.encrypt(plaintext)?;

        self.store.put(&key.to_string(), &ciphertext, ttl).await;

        self.log_action(NewAuditEntry {
            secret_key: key.to_string(),
            action: AuditAction::Create,
            ip_address: ip_address.to_string(),
            ttl_seconds: Some(ttl),
            passphrase_used: passphrase,
        })
        .await;

        Ok(key)
    }

    /// Retrieve a secret, consuming it.
    ///
    /// At most one of any set of concurrent retrieve/delete callers on the
    /// same key succeeds; all others observe `NotFound`. A decrypt failure on
    /// a successfully taken value is an integrity fault and surfaces as
    /// `SecretError::Crypto`, never as `NotFound`.
    pub async fn retrieve_secret(
        &self,
        secret_key: &str,
        ip_address: &str,
    ) -> Result<String, SecretError> {
        let ciphertext = self
            .store
            .take(secret_key)
            .await
            .ok_or(SecretError::NotFound)?;

        let plaintext = self.crypto.decrypt(&ciphertext)?;

        self.log_action(NewAuditEntry {
            secret_key: secret_key.to_string(),
            action: AuditAction::Read,
            ip_address: ip_address.to_string(),
            ttl_seconds: None,
            passphrase_used: None,
        })
        .await;

        Ok(plaintext)
    }

    /// Delete a secret, optionally gated by the passphrase set at creation.
    ///
    /// The secret is consumed from the store before the passphrase is
    /// validated: a wrong passphrase fails with `InvalidPassphrase` but the
    /// secret is gone regardless. Deliberate ordering, biased toward
    /// at-most-one-read over passphrase-gated retention.
    pub async fn delete_secret(
        &self,
        secret_key: &str,
        supplied_passphrase: Option<String>,
        ip_address: &str,
    ) -> Result<(), SecretError> {
        self.store
            .take(secret_key)
            .await
            .ok_or(SecretError::NotFound)?;

        let create_entry = match self.audit.find_create_entry(secret_key).await {
            Ok(entry) => entry,
            Err(e) => {
                // Audit unavailability is never propagated; without the
                // create entry there is no passphrase to check against.
                warn!("Audit lookup failed during delete of {}: {}", secret_key, e);
                None
            }
        };

        if let Some(entry) = create_entry {
            if entry.passphrase_used.is_some() && entry.passphrase_used != supplied_passphrase {
                return Err(SecretError::InvalidPassphrase);
            }
        }

        self.log_action(NewAuditEntry {
            secret_key: secret_key.to_string(),
            action: AuditAction::Delete,
            ip_address: ip_address.to_string(),
            ttl_seconds: None,
            passphrase_used: supplied_passphrase,
        })
        .await;

        Ok(())
    }

    /// Append an audit entry, best-effort.
    ///
    /// The append runs in a spawned task so a request abandoned mid-flight
    /// cannot cancel it; failures are logged and swallowed — the lifecycle
    /// operation's primary effect already stands.
    async fn log_action(&self, entry: NewAuditEntry) {
        let audit = Arc::clone(&self.audit);
        let handle = tokio::spawn(async move {
            let key = entry.secret_key.clone();
            let action = entry.action;
            if let Err(e) = audit.append(entry).await {
                warn!("Audit append failed for {} {}: {}", action, key, e);
            }
        });
        // Await on the success path so callers observe a complete trail; the
        // task keeps running if this future is dropped.
        let _ = handle.await;
    }
}
