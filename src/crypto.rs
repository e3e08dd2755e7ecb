//! Crypto envelope for secret payloads.
//!
//! Uses AES-256-GCM with a single static key loaded from process
//! configuration. Tokens are `base64(nonce || ciphertext)`; the nonce is
//! random per encryption, so encrypting the same plaintext twice yields
//! different tokens. Key material never appears in stored secrets or the
//! audit log.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::RngCore;
use thiserror::Error;

/// Key length in bytes (256 bits for AES-256)
pub const KEY_LENGTH: usize = 32;

/// Nonce length in bytes (96 bits for AES-GCM)
const NONCE_LENGTH: usize = 12;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Encryption failed")]
    Encrypt,

    #[error("Malformed ciphertext: {0}")]
    Malformed(String),

    #[error("Decryption failed: invalid key or corrupted data")]
    Decrypt,
}

/// Symmetric encrypt/decrypt of secret payloads with one process-wide key.
#[derive(Clone)]
pub struct CryptoEnvelope {
    cipher: Aes256Gcm,
}

impl CryptoEnvelope {
    pub fn new(key: [u8; KEY_LENGTH]) -> Self {
        // new_from_slice only fails on wrong length, which the type rules out
        let cipher = Aes256Gcm::new_from_slice(&key).expect("32-byte key");
        Self { cipher }
    }

    /// Encrypt a plaintext payload into an opaque token.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::Encrypt)?;

        let mut combined = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&ciphertext);

        Ok(BASE64.encode(&combined))
    }

    /// Decrypt a token produced by [`encrypt`](Self::encrypt).
    ///
    /// Fails with `CryptoError` on malformed or tampered input. Callers must
    /// treat this as an integrity fault, not as absence.
    pub fn decrypt(&self, token: &str) -> Result<String, CryptoError> {
        let combined = BASE64
            .decode(token.trim())
            .map_err(|e| CryptoError::Malformed(format!("invalid base64: {}", e)))?;

        if combined.len() < NONCE_LENGTH {
            return Err(CryptoError::Malformed("payload too short".to_string()));
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LENGTH);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| CryptoError::Decrypt)?;

        String::from_utf8(plaintext)
            .map_err(|_| CryptoError::Malformed("plaintext is not valid UTF-8".to_string()))
    }
}

/// Parse a key from hex or base64 format.
pub fn parse_key(key_str: &str) -> Result<[u8; KEY_LENGTH], CryptoError> {
    let trimmed = key_str.trim();

    // Try hex first (64 characters = 32 bytes)
    if trimmed.len() == KEY_LENGTH * 2 && trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
        let bytes =
            hex::decode(trimmed).map_err(|e| CryptoError::InvalidKey(format!("bad hex: {}", e)))?;
        let mut key = [0u8; KEY_LENGTH];
        key.copy_from_slice(&bytes);
        return Ok(key);
    }

    // Try base64
    let bytes = BASE64
        .decode(trimmed)
        .map_err(|_| CryptoError::InvalidKey("neither valid hex nor base64".to_string()))?;

    if bytes.len() != KEY_LENGTH {
        return Err(CryptoError::InvalidKey(format!(
            "key must be {} bytes, got {}",
            KEY_LENGTH,
            bytes.len()
        )));
    }

    let mut key = [0u8; KEY_LENGTH];
    key.copy_from_slice(&bytes);
    Ok(key)
}

/// Generate a new random encryption key.
pub fn generate_key() -> [u8; KEY_LENGTH] {
    let mut key = [0u8; KEY_LENGTH];
    rand::thread_rng().fill_bytes(&mut key);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> [u8; KEY_LENGTH] {
        let mut key = [0u8; KEY_LENGTH];
        for (i, byte) in key.iter_mut().enumerate() {
            *byte = i as u8;
        }
        key
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let envelope = CryptoEnvelope::new(test_key());
        let plaintext = "hunter2";

        let token = envelope.encrypt(plaintext).unwrap();
        assert_ne!(token, plaintext);

        let decrypted = envelope.decrypt(&token).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_empty_string() {
        let envelope = CryptoEnvelope::new(test_key());

        let token = envelope.encrypt("").unwrap();
        assert_eq!(envelope.decrypt(&token).unwrap(), "");
    }

    #[test]
    fn test_unicode_content() {
        let envelope = CryptoEnvelope::new(test_key());
        let plaintext = "Пароль: 世界! 🎉";

        let token = envelope.encrypt(plaintext).unwrap();
        assert_eq!(envelope.decrypt(&token).unwrap(), plaintext);
    }

    #[test]
    fn test_different_encryptions_differ() {
        let envelope = CryptoEnvelope::new(test_key());

        let token1 = envelope.encrypt("same-data").unwrap();
        let token2 = envelope.encrypt("same-data").unwrap();

        // Different random nonces should produce different tokens
        assert_ne!(token1, token2);
        assert_eq!(envelope.decrypt(&token1).unwrap(), "same-data");
        assert_eq!(envelope.decrypt(&token2).unwrap(), "same-data");
    }

    #[test]
    fn test_wrong_key_fails() {
        let envelope1 = CryptoEnvelope::new(test_key());
        let mut other = test_key();
        other[0] = 255;
        let envelope2 = CryptoEnvelope::new(other);

        let token = envelope1.encrypt("secret").unwrap();
        assert!(matches!(envelope2.decrypt(&token), Err(CryptoError::Decrypt)));
    }

    #[test]
    fn test_tampered_token_fails() {
        let envelope = CryptoEnvelope::new(test_key());
        let token = envelope.encrypt("secret").unwrap();

        let mut bytes = BASE64.decode(&token).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let tampered = BASE64.encode(&bytes);

        assert!(matches!(envelope.decrypt(&tampered), Err(CryptoError::Decrypt)));
    }

    #[test]
    fn test_malformed_token_fails() {
        let envelope = CryptoEnvelope::new(test_key());

        assert!(matches!(
            envelope.decrypt("not base64 %%%"),
            Err(CryptoError::Malformed(_))
        ));
        // Valid base64 but shorter than a nonce
        assert!(matches!(
            envelope.decrypt(&BASE64.encode([1u8, 2, 3])),
            Err(CryptoError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_key_hex() {
        let hex_key = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";
        let key = parse_key(hex_key).unwrap();

        for (i, byte) in key.iter().enumerate() {
            assert_eq!(*byte, i as u8);
        }
    }

    #[test]
    fn test_parse_key_base64() {
        let key_bytes = test_key();
        let base64_key = BASE64.encode(key_bytes);
        assert_eq!(parse_key(&base64_key).unwrap(), key_bytes);
    }

    #[test]
    fn test_parse_key_invalid() {
        // Too short
        assert!(parse_key("abc").is_err());
        // Right length for hex but invalid digits
        assert!(parse_key(&"z".repeat(KEY_LENGTH * 2)).is_err());
    }

    #[test]
    fn test_generate_key_roundtrips() {
        let key = generate_key();
        let envelope = CryptoEnvelope::new(key);
        let token = envelope.encrypt("payload").unwrap();
        assert_eq!(envelope.decrypt(&token).unwrap(), "payload");
    }
}
