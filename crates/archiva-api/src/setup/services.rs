//! Wiring of the pipeline components into [`AppState`].

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use archiva_core::Config;
use archiva_db::AssetStore;
use archiva_processing::AssetTranscoder;
use archiva_services::{CatalogAllocator, OpenRouterTranslator, Translator};
use archiva_storage::Storage;
use archiva_worker::{CatalogMigration, EnrichmentWorker, ReconcileSweep};

use crate::auth::AuthState;
use crate::services::IngestionService;
use crate::state::AppState;

/// Build the shared state over an already connected store and storage.
pub fn initialize_services(
    config: &Config,
    store: Arc<dyn AssetStore>,
    storage: Arc<dyn Storage>,
) -> Result<Arc<AppState>> {
    let translation_timeout = Duration::from_secs(config.translation_timeout_seconds());
    let translator: Option<Arc<dyn Translator>> = match config.translation_api_key() {
        Some(api_key) => {
            let translator = OpenRouterTranslator::new(
                api_key,
                config.translation_api_url(),
                config.translation_model(),
                translation_timeout,
            )
            .context("Failed to create translation client")?;
            tracing::info!(model = %config.translation_model(), "Translation enrichment enabled");
            Some(Arc::new(translator))
        }
        None => {
            tracing::warn!("TRANSLATION_API_KEY not set, translations will be recorded as skipped");
            None
        }
    };

    let transcoder = AssetTranscoder::new(
        config.image_quality(),
        config.ffprobe_path(),
        config.transcode_concurrency(),
    );
    let allocator = CatalogAllocator::new(
        store.clone(),
        config.catalog_prefix(),
        config.allocation_max_attempts(),
    );
    let enrichment = EnrichmentWorker::new(store.clone(), translator, translation_timeout);

    let ingestion = IngestionService::new(
        config,
        store.clone(),
        storage.clone(),
        transcoder.clone(),
        allocator.clone(),
        enrichment.clone(),
    )
    .context("Failed to create ingestion service")?;

    let reconcile = ReconcileSweep::new(
        store.clone(),
        storage.clone(),
        transcoder,
        config.bucket_prefix(),
    );
    let migration = CatalogMigration::new(
        store.clone(),
        storage.clone(),
        allocator,
        config.bucket_prefix(),
    );

    Ok(Arc::new(AppState {
        config: config.clone(),
        store,
        storage,
        auth: Arc::new(AuthState::new(config.ingest_api_tokens().iter().cloned())),
        ingestion,
        enrichment,
        reconcile,
        migration,
    }))
}
