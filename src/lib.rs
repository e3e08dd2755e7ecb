//! # burnbox
//!
//! One-time secret sharing service: a sender stores a secret once, exactly
//! one retrieval is possible before it vanishes.
//!
//! This library provides:
//! - An encrypted secret lifecycle engine (create / retrieve-once / delete)
//! - An ephemeral key-value store with per-entry expiry and atomic take
//! - An append-only audit log of every create/read/delete action
//! - An HTTP API exposing the lifecycle as `/v1/secrets` endpoints
//!
//! ## Secret flow
//!
//! ```text
//!        ┌──────────────────────────────────┐
//!        │          SecretService           │
//!        │   (lifecycle + passphrase gate)  │
//!        └───────┬───────────────┬──────────┘
//!                │               │
//!                ▼               ▼
//!      ┌────────────────┐  ┌───────────────┐
//!      │ EphemeralStore │  │   AuditLog    │
//!      │ (atomic take)  │  │ (append-only) │
//!      └────────────────┘  └───────────────┘
//! ```
//!
//! Reading a secret consumes it: the store removes the entry atomically on
//! the first successful take, so under concurrent readers exactly one
//! observes the value. Secrets not read before their TTL expire in place.
//!
//! ## Modules
//! - `api`: axum HTTP adapter and server entry point
//! - `service`: the lifecycle state machine
//! - `store`: ephemeral storage backends (memory, sqlite)
//! - `audit`: audit log backends (memory, sqlite)
//! - `crypto`: AES-256-GCM envelope for secret payloads
//! - `config`: environment-driven configuration
//! - `error`: the service error taxonomy

pub mod api;
pub mod audit;
pub mod config;
pub mod crypto;
pub mod error;
pub mod service;
pub mod store;

pub use config::Config;
pub use crypto::CryptoEnvelope;
pub use error::SecretError;
pub use service::SecretService;
