use archiva_core::{IngestedAsset, IngestionStage, NewAsset, TranslationRecord, TranslationStatus};
use async_trait::async_trait;
use uuid::Uuid;

use super::error::PersistenceResult;

/// Metadata store for ingested assets.
///
/// Implementations must enforce uniqueness of both `content_hash` and
/// `catalog_id` atomically on insert and report violations as
/// [`PersistenceError::DuplicateContentHash`](super::PersistenceError::DuplicateContentHash)
/// or [`PersistenceError::DuplicateCatalogId`](super::PersistenceError::DuplicateCatalogId).
#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn insert(&self, asset: &NewAsset) -> PersistenceResult<IngestedAsset>;

    async fn find_by_id(&self, id: Uuid) -> PersistenceResult<Option<IngestedAsset>>;

    async fn find_by_content_hash(&self, content_hash: &str)
        -> PersistenceResult<Option<IngestedAsset>>;

    async fn find_by_catalog_id(&self, catalog_id: &str)
        -> PersistenceResult<Option<IngestedAsset>>;

    /// Highest sequence among current-grammar ids starting with `scope_key`
    /// (`PREFIX-CAT-YYYYMMDD-`), or `None` when the scope is empty.
    async fn max_sequence(&self, scope_key: &str) -> PersistenceResult<Option<u16>>;

    /// Store the outcome of enrichment and move the asset to `stage`.
    async fn record_translation(
        &self,
        id: Uuid,
        status: TranslationStatus,
        translation: &TranslationRecord,
        stage: IngestionStage,
    ) -> PersistenceResult<()>;

    /// Assets whose catalog id still uses the year-only grammar.
    async fn list_legacy(&self) -> PersistenceResult<Vec<IngestedAsset>>;

    async fn count(&self) -> PersistenceResult<i64>;

    /// Rewrite the catalog id and object location of an existing asset.
    async fn update_catalog_id(
        &self,
        id: Uuid,
        catalog_id: &str,
        storage_path: &str,
        storage_url: &str,
    ) -> PersistenceResult<IngestedAsset>;

    async fn ping(&self) -> PersistenceResult<()>;
}
