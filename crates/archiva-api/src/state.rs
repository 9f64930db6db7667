use std::sync::Arc;

use archiva_core::Config;
use archiva_db::AssetStore;
use archiva_storage::Storage;
use archiva_worker::{CatalogMigration, EnrichmentWorker, ReconcileSweep};

use crate::auth::AuthState;
use crate::services::IngestionService;

/// Shared state handed to every handler.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn AssetStore>,
    pub storage: Arc<dyn Storage>,
    pub auth: Arc<AuthState>,
    pub ingestion: IngestionService,
    pub enrichment: EnrichmentWorker,
    pub reconcile: ReconcileSweep,
    pub migration: CatalogMigration,
}
