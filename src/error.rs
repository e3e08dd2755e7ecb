//! Domain error taxonomy for the secret lifecycle.

use thiserror::Error;

use crate::crypto::CryptoError;

/// Failures surfaced by the lifecycle service.
///
/// Store and audit-log outages are absorbed at the adapter boundary and never
/// appear here: a store outage degrades to `NotFound`, an audit failure is
/// logged and swallowed. Crypto and passphrase faults always surface.
#[derive(Debug, Error)]
pub enum SecretError {
    /// Key absent, expired, or already consumed.
    #[error("Secret not found")]
    NotFound,

    /// Passphrase mismatch on delete.
    #[error("Invalid passphrase")]
    InvalidPassphrase,

    /// Decrypt failure on retrieved ciphertext: corruption or key mismatch.
    #[error("Secret integrity fault: {0}")]
    Crypto(#[from] CryptoError),
}
