//! Application setup and initialization

pub mod database;
pub mod routes;
pub mod server;
pub mod services;

use std::sync::Arc;

use anyhow::{Context, Result};
use archiva_core::Config;
use archiva_db::AssetRepository;

use crate::state::AppState;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    config.validate().context("Configuration validation failed")?;

    archiva_infra::init_telemetry(config.log_format())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment(),
        "Configuration loaded and validated successfully"
    );

    let pool = database::setup_database(&config).await?;

    let storage = archiva_storage::create_storage(&config)
        .await
        .context("Failed to initialize storage")?;
    tracing::info!(backend = ?storage.backend_type(), "Storage initialized");

    let state = services::initialize_services(
        &config,
        Arc::new(AssetRepository::new(pool)),
        storage,
    )?;

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
