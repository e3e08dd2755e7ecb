//! HTTP server wiring and shared state.

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, response::Json, routing::get, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::audit;
use crate::config::Config;
use crate::crypto::CryptoEnvelope;
use crate::service::SecretService;
use crate::store::{self, EphemeralStore};

use super::secrets as secrets_api;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub service: SecretService,
}

/// Build the application router for the given state.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/v1/secrets", secrets_api::routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let store = store::create_store(config.store_backend, config.data_dir.clone())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize ephemeral store: {}", e))?;
    let audit_log = audit::create_audit_log(config.store_backend, config.data_dir.clone())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize audit log: {}", e))?;

    tracing::info!(
        "Stores initialized: ephemeral persistent={}, audit persistent={}",
        store.is_persistent(),
        audit_log.is_persistent()
    );

    // Background expiry sweeper. Callers cannot distinguish swept entries
    // from passively expired ones; this just reclaims space.
    spawn_sweeper(Arc::clone(&store), config.sweep_interval_seconds);

    let service = SecretService::new(
        CryptoEnvelope::new(config.encryption_key),
        store,
        audit_log,
        config.min_ttl_seconds,
    );

    let state = Arc::new(AppState {
        config: config.clone(),
        service,
    });

    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

fn spawn_sweeper(store: Arc<dyn EphemeralStore>, interval_seconds: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_seconds.max(1)));
        loop {
            interval.tick().await;
            let swept = store.sweep_expired().await;
            if swept > 0 {
                tracing::debug!("Swept {} expired secrets", swept);
            }
        }
    });
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    store_backend: String,
}

/// Health check endpoint.
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store_backend: state.config.store_backend.to_string(),
    })
}
