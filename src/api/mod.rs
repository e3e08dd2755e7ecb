//! HTTP API for burnbox.
//!
//! ## Endpoints
//!
//! - `POST /v1/secrets/secret` - Store a secret, returns its one-time key
//! - `GET /v1/secrets/secret/{key}` - Retrieve (and destroy) a secret
//! - `DELETE /v1/secrets/secret/{key}` - Delete a secret, passphrase-gated
//! - `GET /health` - Health check
//!
//! Secret-bearing responses carry cache-defeating headers so intermediaries
//! never cache a payload.

mod routes;
pub mod secrets;

pub use routes::{build_router, serve, AppState};
