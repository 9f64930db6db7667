//! Reconciliation sweep
//!
//! Lists the canonical objects under the bucket prefix and backfills a minimal
//! metadata record for every object whose catalog id has none. Re-running is
//! harmless: records are matched by catalog id and by content hash before
//! anything is written, and a unique violation on insert counts as "exists".

use std::sync::Arc;

use archiva_core::{
    AppError, AssetMetadata, CatalogId, IngestionStage, MediaType, NewAsset, TranslationStatus,
};
use archiva_db::{AssetStore, PersistenceError};
use archiva_processing::{content_hash, AssetTranscoder};
use archiva_services::media_type_for_extension;
use archiva_storage::{parse_asset_key, ObjectEntry, Storage};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// Note stored on every backfilled record.
pub const RECONCILED_NOTE: &str = "Recovered by reconciliation sweep";

const RECONCILED_PLATFORM: &str = "manual";

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileCandidate {
    pub key: String,
    pub catalog_id: String,
    pub url: String,
    pub size: u64,
}

/// What a sweep would do, without writing anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconcilePreview {
    pub to_create: Vec<ReconcileCandidate>,
    /// Catalog ids that already have a record.
    pub exists: Vec<String>,
    /// Keys that do not follow the canonical grammar.
    pub invalid: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileStatus {
    Created,
    Exists,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileItem {
    pub key: String,
    pub catalog_id: String,
    pub url: String,
    pub status: ReconcileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct ReconcileSummary {
    pub total: usize,
    pub created: usize,
    pub exists: usize,
    pub errored: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct ReconcileReport {
    pub summary: ReconcileSummary,
    pub results: Vec<ReconcileItem>,
}

enum Classified {
    Invalid(String),
    Exists(ReconcileCandidate, Uuid),
    Missing(ReconcileCandidate, CatalogId, String),
}

#[derive(Clone)]
pub struct ReconcileSweep {
    store: Arc<dyn AssetStore>,
    storage: Arc<dyn Storage>,
    transcoder: AssetTranscoder,
    bucket_prefix: String,
}

impl ReconcileSweep {
    pub fn new(
        store: Arc<dyn AssetStore>,
        storage: Arc<dyn Storage>,
        transcoder: AssetTranscoder,
        bucket_prefix: impl Into<String>,
    ) -> Self {
        Self {
            store,
            storage,
            transcoder,
            bucket_prefix: bucket_prefix.into(),
        }
    }

    #[tracing::instrument(skip(self), fields(bucket_prefix = %self.bucket_prefix))]
    pub async fn preview(&self) -> Result<ReconcilePreview, AppError> {
        let mut preview = ReconcilePreview::default();
        for classified in self.classify().await? {
            match classified {
                Classified::Invalid(key) => preview.invalid.push(key),
                Classified::Exists(candidate, _) => preview.exists.push(candidate.catalog_id),
                Classified::Missing(candidate, _, _) => preview.to_create.push(candidate),
            }
        }
        tracing::info!(
            to_create = preview.to_create.len(),
            exists = preview.exists.len(),
            invalid = preview.invalid.len(),
            "Reconciliation preview"
        );
        Ok(preview)
    }

    /// Backfill every missing record. One object failing does not stop the sweep.
    #[tracing::instrument(skip(self), fields(bucket_prefix = %self.bucket_prefix))]
    pub async fn run(&self) -> Result<ReconcileReport, AppError> {
        let start = std::time::Instant::now();
        let mut report = ReconcileReport::default();

        for classified in self.classify().await? {
            let item = match classified {
                Classified::Invalid(key) => {
                    tracing::debug!(key = %key, "Skipping non-canonical object");
                    continue;
                }
                Classified::Exists(candidate, asset_id) => {
                    item(candidate, ReconcileStatus::Exists, Some(asset_id), None)
                }
                Classified::Missing(candidate, catalog_id, extension) => {
                    match self.backfill(&candidate, &catalog_id, &extension).await {
                        Ok((status, asset_id)) => item(candidate, status, Some(asset_id), None),
                        Err(e) => {
                            tracing::error!(
                                key = %candidate.key,
                                error = %e,
                                "Failed to backfill record"
                            );
                            item(candidate, ReconcileStatus::Error, None, Some(e.to_string()))
                        }
                    }
                }
            };

            match item.status {
                ReconcileStatus::Created => report.summary.created += 1,
                ReconcileStatus::Exists => report.summary.exists += 1,
                ReconcileStatus::Error => report.summary.errored += 1,
            }
            report.results.push(item);
        }
        report.summary.total = report.results.len();

        tracing::info!(
            total = report.summary.total,
            created = report.summary.created,
            exists = report.summary.exists,
            errored = report.summary.errored,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Reconciliation complete"
        );
        Ok(report)
    }

    async fn classify(&self) -> Result<Vec<Classified>, AppError> {
        let prefix = format!("{}/", self.bucket_prefix.trim_matches('/'));
        let mut objects: Vec<ObjectEntry> = self.storage.list(&prefix).await?;
        objects.sort_by(|a, b| a.key.cmp(&b.key));

        let mut classified = Vec::with_capacity(objects.len());
        for object in objects {
            let Some((catalog_id, extension)) = parse_asset_key(&object.key) else {
                classified.push(Classified::Invalid(object.key));
                continue;
            };
            let candidate = ReconcileCandidate {
                url: self.storage.public_url(&object.key),
                catalog_id: catalog_id.to_string(),
                key: object.key,
                size: object.size,
            };
            match self.store.find_by_catalog_id(&candidate.catalog_id).await? {
                Some(existing) => classified.push(Classified::Exists(candidate, existing.id)),
                None => classified.push(Classified::Missing(candidate, catalog_id, extension)),
            }
        }
        Ok(classified)
    }

    async fn backfill(
        &self,
        candidate: &ReconcileCandidate,
        catalog_id: &CatalogId,
        extension: &str,
    ) -> Result<(ReconcileStatus, Uuid), AppError> {
        let bytes = self.storage.get(&candidate.key).await?;
        let hash = content_hash(&bytes);

        // Same bytes already archived under another id.
        if let Some(existing) = self.store.find_by_content_hash(&hash).await? {
            return Ok((ReconcileStatus::Exists, existing.id));
        }

        let media_type = media_type_for_extension(extension).unwrap_or(MediaType::Image);
        let blur_data_url = self.transcoder.preview(bytes.clone(), media_type).await;

        let new_asset = NewAsset {
            catalog_id: candidate.catalog_id.clone(),
            event_date: Some(catalog_id.date()),
            source_url: None,
            source_platform: RECONCILED_PLATFORM.to_string(),
            source_post_id: None,
            content_hash: hash.clone(),
            storage_path: candidate.key.clone(),
            storage_url: candidate.url.clone(),
            media_type,
            metadata: AssetMetadata {
                size_bytes: bytes.len() as u64,
                format: extension.to_string(),
                ..Default::default()
            },
            blur_data_url,
            title: None,
            description: None,
            tags: vec![],
            translation_status: TranslationStatus::Skipped,
            ingestion_stage: IngestionStage::Ready,
            notes: Some(RECONCILED_NOTE.to_string()),
        };

        match self.store.insert(&new_asset).await {
            Ok(asset) => {
                tracing::info!(asset.id = %asset.id, catalog_id = %asset.catalog_id, "Backfilled record");
                Ok((ReconcileStatus::Created, asset.id))
            }
            // Another sweep or an ingest got there first.
            Err(PersistenceError::DuplicateCatalogId(_)) => {
                let existing = self.store.find_by_catalog_id(&candidate.catalog_id).await?;
                existing
                    .map(|a| (ReconcileStatus::Exists, a.id))
                    .ok_or_else(|| AppError::Persistence("catalog id vanished".to_string()))
            }
            Err(PersistenceError::DuplicateContentHash(_)) => {
                let existing = self.store.find_by_content_hash(&hash).await?;
                existing
                    .map(|a| (ReconcileStatus::Exists, a.id))
                    .ok_or_else(|| AppError::Persistence("content hash vanished".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn item(
    candidate: ReconcileCandidate,
    status: ReconcileStatus,
    asset_id: Option<Uuid>,
    error: Option<String>,
) -> ReconcileItem {
    ReconcileItem {
        key: candidate.key,
        catalog_id: candidate.catalog_id,
        url: candidate.url,
        status,
        asset_id,
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::new_asset;
    use archiva_db::InMemoryAssetStore;
    use archiva_storage::LocalStorage;
    use bytes::Bytes;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, Arc<InMemoryAssetStore>, Arc<LocalStorage>, ReconcileSweep) {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(
            LocalStorage::new(dir.path(), "http://localhost:3000/media".to_string())
                .await
                .unwrap(),
        );
        let store = Arc::new(InMemoryAssetStore::new());
        let sweep = ReconcileSweep::new(
            store.clone(),
            storage.clone(),
            AssetTranscoder::new(90, "ffprobe", 1),
            "magazines",
        );
        (dir, store, storage, sweep)
    }

    async fn put(storage: &LocalStorage, key: &str, body: &'static [u8]) {
        storage
            .put(key, Bytes::from_static(body), "image/webp")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn preview_classifies_objects() {
        let (_dir, store, storage, sweep) = setup().await;
        store
            .insert(&new_asset("LMSY-MAG-20241023-001", "known"))
            .await
            .unwrap();
        put(&storage, "magazines/2024/LMSY-MAG-20241023-001.webp", b"one").await;
        put(&storage, "magazines/2024/LMSY-MAG-20241023-002.webp", b"two").await;
        put(&storage, "magazines/2024/cover-final.webp", b"stray").await;

        let preview = sweep.preview().await.unwrap();

        assert_eq!(preview.exists, vec!["LMSY-MAG-20241023-001".to_string()]);
        assert_eq!(preview.to_create.len(), 1);
        assert_eq!(preview.to_create[0].catalog_id, "LMSY-MAG-20241023-002");
        assert_eq!(preview.to_create[0].size, 3);
        assert_eq!(preview.invalid, vec!["magazines/2024/cover-final.webp".to_string()]);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn run_backfills_missing_records_once() {
        let (_dir, store, storage, sweep) = setup().await;
        put(&storage, "magazines/2024/LMSY-STILL-20240602-004.webp", b"orphan").await;

        let report = sweep.run().await.unwrap();
        assert_eq!(report.summary.created, 1);
        assert_eq!(report.summary.total, 1);

        let asset = store
            .find_by_catalog_id("LMSY-STILL-20240602-004")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(asset.notes.as_deref(), Some(RECONCILED_NOTE));
        assert_eq!(asset.source_platform, "manual");
        assert_eq!(asset.ingestion_stage, IngestionStage::Ready);
        assert_eq!(asset.translation_status, TranslationStatus::Skipped);
        assert_eq!(asset.event_date, chrono::NaiveDate::from_ymd_opt(2024, 6, 2));
        assert_eq!(asset.content_hash, content_hash(b"orphan"));
        assert_eq!(asset.storage_path, "magazines/2024/LMSY-STILL-20240602-004.webp");

        let again = sweep.run().await.unwrap();
        assert_eq!(again.summary.created, 0);
        assert_eq!(again.summary.exists, 1);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn same_bytes_under_another_id_are_not_duplicated() {
        let (_dir, store, storage, sweep) = setup().await;
        let mut archived = new_asset("LMSY-G-20240101-001", "");
        archived.content_hash = content_hash(b"same");
        store.insert(&archived).await.unwrap();
        put(&storage, "magazines/2024/LMSY-G-20240101-009.webp", b"same").await;

        let report = sweep.run().await.unwrap();

        assert_eq!(report.summary.exists, 1);
        assert_eq!(report.results[0].status, ReconcileStatus::Exists);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[test]
    fn report_serializes_lowercase_status() {
        let value = serde_json::to_value(ReconcileItem {
            key: "magazines/2024/LMSY-G-20240101-001.webp".to_string(),
            catalog_id: "LMSY-G-20240101-001".to_string(),
            url: "http://localhost/x".to_string(),
            status: ReconcileStatus::Created,
            asset_id: None,
            error: None,
        })
        .unwrap();
        assert_eq!(value["status"], "created");
        assert_eq!(value["catalogId"], "LMSY-G-20240101-001");
        assert!(value.get("error").is_none());
    }
}
