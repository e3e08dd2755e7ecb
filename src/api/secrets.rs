//! API endpoints for the secret lifecycle.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Path, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SecretError;

use super::routes::AppState;

/// Default secret lifetime when the caller does not supply one (1 hour).
const DEFAULT_TTL_SECONDS: u64 = 3600;

/// Create the secret API routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/secret", axum::routing::post(create_secret))
        .route(
            "/secret/:secret_key",
            get(retrieve_secret).delete(delete_secret),
        )
}

/// Request to create a secret.
#[derive(Debug, Deserialize)]
pub struct CreateSecretRequest {
    pub secret: String,
    pub passphrase: Option<String>,
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
}

fn default_ttl() -> u64 {
    DEFAULT_TTL_SECONDS
}

/// Response carrying the one-time key of a stored secret.
#[derive(Debug, Serialize)]
pub struct CreateSecretResponse {
    pub secret_key: Uuid,
}

/// Response carrying a retrieved secret payload.
#[derive(Debug, Serialize)]
pub struct RetrieveSecretResponse {
    pub secret: String,
}

/// Request to delete a secret.
#[derive(Debug, Deserialize)]
pub struct DeleteSecretRequest {
    pub passphrase: Option<String>,
}

/// Response for a successful delete.
#[derive(Debug, Serialize)]
pub struct DeleteSecretResponse {
    pub status: String,
}

/// Headers that keep intermediaries from ever caching a secret payload.
fn no_store_headers() -> [(HeaderName, HeaderValue); 3] {
    [
        (
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, must-revalidate"),
        ),
        (header::PRAGMA, HeaderValue::from_static("no-cache")),
        (header::EXPIRES, HeaderValue::from_static("0")),
    ]
}

/// Map a domain failure to its HTTP form, leaking no internal detail.
fn map_secret_error(e: SecretError) -> (StatusCode, String) {
    match e {
        SecretError::NotFound => (StatusCode::NOT_FOUND, "Secret not found".to_string()),
        SecretError::InvalidPassphrase => (StatusCode::FORBIDDEN, "Invalid passphrase".to_string()),
        SecretError::Crypto(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Secret integrity fault".to_string(),
        ),
    }
}

/// POST /v1/secrets/secret
/// Store a secret; returns the key that allows its single retrieval.
async fn create_secret(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<CreateSecretRequest>,
) -> Result<
    (
        StatusCode,
        [(HeaderName, HeaderValue); 3],
        Json<CreateSecretResponse>,
    ),
    (StatusCode, String),
> {
    if req.secret.is_empty() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "Secret must not be empty".to_string(),
        ));
    }

    let secret_key = state
        .service
        .create_secret(
            &req.secret,
            req.passphrase,
            req.ttl_seconds,
            &addr.ip().to_string(),
        )
        .await
        .map_err(map_secret_error)?;

    Ok((
        StatusCode::CREATED,
        no_store_headers(),
        Json(CreateSecretResponse { secret_key }),
    ))
}

/// GET /v1/secrets/secret/{secret_key}
/// Retrieve a secret. The first successful call destroys it.
async fn retrieve_secret(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(secret_key): Path<String>,
) -> Result<
    (
        [(HeaderName, HeaderValue); 3],
        Json<RetrieveSecretResponse>,
    ),
    (StatusCode, String),
> {
    let secret = state
        .service
        .retrieve_secret(&secret_key, &addr.ip().to_string())
        .await
        .map_err(map_secret_error)?;

    Ok((
        no_store_headers(),
        Json(RetrieveSecretResponse { secret }),
    ))
}

/// DELETE /v1/secrets/secret/{secret_key}
/// Delete a secret. If it was created with a passphrase, the same passphrase
/// must be supplied.
async fn delete_secret(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(secret_key): Path<String>,
    body: Option<Json<DeleteSecretRequest>>,
) -> Result<
    (
        [(HeaderName, HeaderValue); 3],
        Json<DeleteSecretResponse>,
    ),
    (StatusCode, String),
> {
    let passphrase = body.and_then(|Json(req)| req.passphrase);

    state
        .service
        .delete_secret(&secret_key, passphrase, &addr.ip().to_string())
        .await
        .map_err(map_secret_error)?;

    Ok((
        no_store_headers(),
        Json(DeleteSecretResponse {
            status: "secret_deleted".to_string(),
        }),
    ))
}
