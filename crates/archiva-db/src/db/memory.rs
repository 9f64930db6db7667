use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use archiva_core::{
    IngestedAsset, IngestionStage, LegacyCatalogId, NewAsset, TranslationRecord,
    TranslationStatus,
};
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::error::{PersistenceError, PersistenceResult};
use super::store::AssetStore;

/// [`AssetStore`] kept in process memory.
///
/// Enforces the same two uniqueness constraints as the `assets` table. An
/// optional read latency widens the window between reading the highest
/// sequence and inserting, which makes allocation races reproducible.
#[derive(Default)]
pub struct InMemoryAssetStore {
    assets: Mutex<HashMap<Uuid, IngestedAsset>>,
    read_latency: Option<Duration>,
    fail_writes: AtomicBool,
    missed_hash_lookups: AtomicUsize,
}

impl InMemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_read_latency(latency: Duration) -> Self {
        Self {
            read_latency: Some(latency),
            ..Self::default()
        }
    }

    /// Make every subsequent insert fail as if the database were unreachable.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Answer the next `count` content-hash lookups with `None`, as if a
    /// concurrent insert had not landed yet. The unique constraint still holds.
    pub fn miss_hash_lookups(&self, count: usize) {
        self.missed_hash_lookups.store(count, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> Vec<IngestedAsset> {
        let mut assets: Vec<IngestedAsset> = self.lock().values().cloned().collect();
        assets.sort_by(|a, b| a.catalog_id.cmp(&b.catalog_id));
        assets
    }

    /// Insert a fully formed record as-is, bypassing id and timestamp assignment.
    pub fn seed(&self, asset: IngestedAsset) {
        self.lock().insert(asset.id, asset);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, IngestedAsset>> {
        self.assets.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn pause(&self) {
        if let Some(latency) = self.read_latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn find(&self, pred: impl Fn(&IngestedAsset) -> bool) -> Option<IngestedAsset> {
        self.lock().values().find(|a| pred(a)).cloned()
    }
}

#[async_trait]
impl AssetStore for InMemoryAssetStore {
    async fn insert(&self, asset: &NewAsset) -> PersistenceResult<IngestedAsset> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistenceError::Database(sqlx::Error::PoolTimedOut));
        }

        let mut assets = self.lock();
        if assets.values().any(|a| a.content_hash == asset.content_hash) {
            return Err(PersistenceError::DuplicateContentHash(
                asset.content_hash.clone(),
            ));
        }
        if assets.values().any(|a| a.catalog_id == asset.catalog_id) {
            return Err(PersistenceError::DuplicateCatalogId(asset.catalog_id.clone()));
        }

        let now = Utc::now();
        let record = IngestedAsset {
            id: Uuid::new_v4(),
            catalog_id: asset.catalog_id.clone(),
            event_date: asset.event_date,
            source_url: asset.source_url.clone(),
            source_platform: asset.source_platform.clone(),
            source_post_id: asset.source_post_id.clone(),
            content_hash: asset.content_hash.clone(),
            storage_path: asset.storage_path.clone(),
            storage_url: asset.storage_url.clone(),
            media_type: asset.media_type,
            metadata: asset.metadata.clone(),
            blur_data_url: asset.blur_data_url.clone(),
            title: asset.title.clone(),
            description: asset.description.clone(),
            tags: asset.tags.clone(),
            translation_status: asset.translation_status,
            translation: TranslationRecord::default(),
            ingestion_stage: asset.ingestion_stage,
            notes: asset.notes.clone(),
            created_at: now,
            updated_at: now,
        };
        assets.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> PersistenceResult<Option<IngestedAsset>> {
        Ok(self.lock().get(&id).cloned())
    }

    async fn find_by_content_hash(
        &self,
        content_hash: &str,
    ) -> PersistenceResult<Option<IngestedAsset>> {
        let missed = self
            .missed_hash_lookups
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if missed {
            return Ok(None);
        }
        Ok(self.find(|a| a.content_hash == content_hash))
    }

    async fn find_by_catalog_id(
        &self,
        catalog_id: &str,
    ) -> PersistenceResult<Option<IngestedAsset>> {
        Ok(self.find(|a| a.catalog_id == catalog_id))
    }

    async fn max_sequence(&self, scope_key: &str) -> PersistenceResult<Option<u16>> {
        let max = self
            .lock()
            .values()
            .filter_map(|a| a.catalog_id.strip_prefix(scope_key))
            .filter(|tail| tail.len() == 3 && tail.chars().all(|c| c.is_ascii_digit()))
            .filter_map(|tail| tail.parse::<u16>().ok())
            .max();
        self.pause().await;
        Ok(max)
    }

    async fn record_translation(
        &self,
        id: Uuid,
        status: TranslationStatus,
        translation: &TranslationRecord,
        stage: IngestionStage,
    ) -> PersistenceResult<()> {
        let mut assets = self.lock();
        let asset = assets.get_mut(&id).ok_or(PersistenceError::NotFound(id))?;
        asset.translation_status = status;
        asset.translation = translation.clone();
        asset.ingestion_stage = stage;
        asset.updated_at = Utc::now();
        Ok(())
    }

    async fn list_legacy(&self) -> PersistenceResult<Vec<IngestedAsset>> {
        let mut legacy: Vec<IngestedAsset> = self
            .lock()
            .values()
            .filter(|a| LegacyCatalogId::parse(&a.catalog_id).is_ok())
            .cloned()
            .collect();
        legacy.sort_by_key(|a| a.created_at);
        Ok(legacy)
    }

    async fn count(&self) -> PersistenceResult<i64> {
        Ok(self.lock().len() as i64)
    }

    async fn update_catalog_id(
        &self,
        id: Uuid,
        catalog_id: &str,
        storage_path: &str,
        storage_url: &str,
    ) -> PersistenceResult<IngestedAsset> {
        let mut assets = self.lock();
        if assets
            .values()
            .any(|a| a.id != id && a.catalog_id == catalog_id)
        {
            return Err(PersistenceError::DuplicateCatalogId(catalog_id.to_string()));
        }
        let asset = assets.get_mut(&id).ok_or(PersistenceError::NotFound(id))?;
        asset.catalog_id = catalog_id.to_string();
        asset.storage_path = storage_path.to_string();
        asset.storage_url = storage_url.to_string();
        asset.updated_at = Utc::now();
        Ok(asset.clone())
    }

    async fn ping(&self) -> PersistenceResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archiva_core::{AssetMetadata, MediaType};

    fn new_asset(catalog_id: &str, hash: &str) -> NewAsset {
        NewAsset {
            catalog_id: catalog_id.to_string(),
            event_date: None,
            source_url: Some("https://weibo.com/1/abc".to_string()),
            source_platform: "weibo".to_string(),
            source_post_id: None,
            content_hash: hash.to_string(),
            storage_path: format!("magazines/2024/{}.webp", catalog_id),
            storage_url: format!("http://localhost/magazines/2024/{}.webp", catalog_id),
            media_type: MediaType::Image,
            metadata: AssetMetadata::default(),
            blur_data_url: None,
            title: None,
            description: None,
            tags: vec![],
            translation_status: TranslationStatus::Pending,
            ingestion_stage: IngestionStage::Translating,
            notes: None,
        }
    }

    #[tokio::test]
    async fn insert_enforces_both_unique_keys() {
        let store = InMemoryAssetStore::new();
        store
            .insert(&new_asset("LMSY-MAG-20241023-000", "aa"))
            .await
            .unwrap();

        let dup_hash = store.insert(&new_asset("LMSY-MAG-20241023-001", "aa")).await;
        assert!(matches!(dup_hash, Err(PersistenceError::DuplicateContentHash(_))));

        let dup_id = store.insert(&new_asset("LMSY-MAG-20241023-000", "bb")).await;
        assert!(matches!(dup_id, Err(PersistenceError::DuplicateCatalogId(_))));

        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn max_sequence_is_scoped() {
        let store = InMemoryAssetStore::new();
        for (id, hash) in [
            ("LMSY-MAG-20241023-000", "a"),
            ("LMSY-MAG-20241023-004", "b"),
            ("LMSY-MAG-20241024-009", "c"),
            ("LMSY-MAG-2024-017", "d"),
        ] {
            store.insert(&new_asset(id, hash)).await.unwrap();
        }

        assert_eq!(
            store.max_sequence("LMSY-MAG-20241023-").await.unwrap(),
            Some(4)
        );
        assert_eq!(store.max_sequence("LMSY-G-20241023-").await.unwrap(), None);
    }

    #[tokio::test]
    async fn legacy_listing_and_rename() {
        let store = InMemoryAssetStore::new();
        let legacy = store
            .insert(&new_asset("LMSY-ED-2023-002", "a"))
            .await
            .unwrap();
        store
            .insert(&new_asset("LMSY-MAG-20241023-001", "b"))
            .await
            .unwrap();

        let found = store.list_legacy().await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, legacy.id);

        let clash = store
            .update_catalog_id(legacy.id, "LMSY-MAG-20241023-001", "k", "u")
            .await;
        assert!(matches!(clash, Err(PersistenceError::DuplicateCatalogId(_))));

        let renamed = store
            .update_catalog_id(legacy.id, "LMSY-MAG-20230101-001", "k", "u")
            .await
            .unwrap();
        assert_eq!(renamed.catalog_id, "LMSY-MAG-20230101-001");
        assert!(store.list_legacy().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn record_translation_updates_stage() {
        let store = InMemoryAssetStore::new();
        let asset = store
            .insert(&new_asset("LMSY-G-20240101-001", "a"))
            .await
            .unwrap();

        store
            .record_translation(
                asset.id,
                TranslationStatus::Skipped,
                &TranslationRecord::default(),
                IngestionStage::Ready,
            )
            .await
            .unwrap();

        let stored = store.find_by_id(asset.id).await.unwrap().unwrap();
        assert_eq!(stored.translation_status, TranslationStatus::Skipped);
        assert_eq!(stored.ingestion_stage, IngestionStage::Ready);

        let missing = store
            .record_translation(
                Uuid::new_v4(),
                TranslationStatus::Completed,
                &TranslationRecord::default(),
                IngestionStage::Ready,
            )
            .await;
        assert!(matches!(missing, Err(PersistenceError::NotFound(_))));
    }

    #[tokio::test]
    async fn failing_writes_surface_database_errors() {
        let store = InMemoryAssetStore::new();
        store.fail_writes(true);
        let result = store.insert(&new_asset("LMSY-G-20240101-001", "a")).await;
        assert!(matches!(result, Err(PersistenceError::Database(_))));
    }
}
