use anyhow::Result;
use axum::Router;
use std::{io::ErrorKind, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod providers;
mod routes;
mod services;
mod state;

use providers::{
    detector::NullDetector, identity::UnconfiguredIdentityProvider, roles::UnconfiguredRoleStore,
};
use services::{
    auth_gate::AuthGate,
    document_service::{DocumentService, StoreConfig},
    prediction::PredictionClient,
};
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config ---
    let cfg = config::AppConfig::from_env_and_args()?;
    tracing::info!("Starting docvault with config: {:?}", cfg);

    // --- Session/authorization gate ---
    let local_admin = cfg.local_admin();
    if local_admin.is_some() {
        tracing::warn!(
            "local admin account enabled; this bypasses the identity provider and must not \
             be used in production"
        );
    }
    let gate = Arc::new(AuthGate::new(
        Arc::new(UnconfiguredIdentityProvider),
        Arc::new(UnconfiguredRoleStore),
        cfg.admin_allowlist.clone(),
        local_admin,
    ));
    // Resolve the initial Unknown state against the provider.
    if let Err(err) = gate.refresh().await {
        tracing::warn!("initial session resolution failed: {}", err);
    }

    // --- Document catalog ---
    let documents = Arc::new(DocumentService::new(
        StoreConfig {
            database_url: cfg.database_url.clone(),
            storage_dir: cfg.storage_dir.clone().into(),
        },
        gate.clone(),
    ));
    documents.initialize().await;
    if !documents.is_available() {
        tracing::warn!("document store unavailable; catalog operations will be no-ops");
    }

    // --- Build router ---
    let app_state = AppState {
        documents,
        gate,
        detector: Arc::new(NullDetector),
        predictor: PredictionClient::new(cfg.prediction_url.clone()),
    };
    let app: Router = routes::routes::routes().with_state(app_state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
