//! Legacy catalog id migration
//!
//! Rewrites `PREFIX-CAT-YYYY-NNN` ids into the dated grammar, keeping category
//! and sequence and taking the date from the event date (else the creation
//! day). The stored object is copied to its new canonical key before the
//! record is updated, and the old object is removed afterwards.
//!
//! When the rewritten id already belongs to another asset, the record gets the
//! next free member sequence of the same scope instead.

use std::sync::Arc;

use archiva_core::{AppError, CatalogId, CatalogRole, IngestedAsset, LegacyCatalogId, MediaType};
use archiva_db::{AssetStore, PersistenceError};
use archiva_processing::content_type_for_extension;
use archiva_services::{CatalogAllocator, Claim};
use archiva_storage::{asset_key, Storage, StorageError};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MigrationChange {
    pub asset_id: Uuid,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MigrationFailure {
    pub asset_id: Uuid,
    pub catalog_id: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub dry_run: bool,
    pub total_records: i64,
    pub legacy_ids: usize,
    /// In a dry run, the number of records that would be migrated.
    pub migrated: usize,
    pub failed: usize,
    pub changes: Vec<MigrationChange>,
    pub errors: Vec<MigrationFailure>,
}

#[derive(Clone)]
pub struct CatalogMigration {
    store: Arc<dyn AssetStore>,
    storage: Arc<dyn Storage>,
    allocator: CatalogAllocator,
    bucket_prefix: String,
}

impl CatalogMigration {
    pub fn new(
        store: Arc<dyn AssetStore>,
        storage: Arc<dyn Storage>,
        allocator: CatalogAllocator,
        bucket_prefix: impl Into<String>,
    ) -> Self {
        Self {
            store,
            storage,
            allocator,
            bucket_prefix: bucket_prefix.into(),
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn run(&self, dry_run: bool) -> Result<MigrationReport, AppError> {
        let total_records = self.store.count().await?;
        let legacy = self.store.list_legacy().await?;

        let mut report = MigrationReport {
            dry_run,
            total_records,
            legacy_ids: legacy.len(),
            ..Default::default()
        };

        for asset in &legacy {
            let result = if dry_run {
                self.plan(asset).await
            } else {
                self.migrate(asset).await
            };
            match result {
                Ok(to) => {
                    tracing::info!(
                        asset.id = %asset.id,
                        from = %asset.catalog_id,
                        to = %to,
                        dry_run,
                        "Catalog id migrated"
                    );
                    report.migrated += 1;
                    report.changes.push(MigrationChange {
                        asset_id: asset.id,
                        from: asset.catalog_id.clone(),
                        to: to.to_string(),
                    });
                }
                Err(e) => {
                    tracing::error!(
                        asset.id = %asset.id,
                        catalog_id = %asset.catalog_id,
                        error = %e,
                        "Catalog id migration failed"
                    );
                    report.failed += 1;
                    report.errors.push(MigrationFailure {
                        asset_id: asset.id,
                        catalog_id: asset.catalog_id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            total_records = report.total_records,
            legacy_ids = report.legacy_ids,
            migrated = report.migrated,
            failed = report.failed,
            dry_run,
            "Catalog id migration complete"
        );
        Ok(report)
    }

    /// Id the asset would get, without writing.
    async fn plan(&self, asset: &IngestedAsset) -> Result<CatalogId, AppError> {
        let target = migrated_id(asset)?;
        match self.store.find_by_catalog_id(&target.to_string()).await? {
            Some(holder) if holder.id != asset.id => Ok(self
                .allocator
                .allocate(target.category(), target.date(), CatalogRole::Member)
                .await?),
            _ => Ok(target),
        }
    }

    async fn migrate(&self, asset: &IngestedAsset) -> Result<CatalogId, AppError> {
        let target = migrated_id(asset)?;
        let extension = stored_extension(asset);
        let extension = extension.as_str();

        if let Claim::Committed(_) = self.claim(asset, target.clone(), extension).await? {
            self.remove_old_object(asset).await;
            return Ok(target);
        }

        tracing::warn!(
            asset.id = %asset.id,
            catalog_id = %target,
            "Migrated id already taken, renumbering within scope"
        );
        let (id, _) = self
            .allocator
            .allocate_and_commit(
                target.category(),
                target.date(),
                CatalogRole::Member,
                move |id| self.claim(asset, id, extension),
            )
            .await?;
        self.remove_old_object(asset).await;
        Ok(id)
    }

    /// Copy the object to the key of `id` and point the record at it.
    async fn claim(
        &self,
        asset: &IngestedAsset,
        id: CatalogId,
        extension: &str,
    ) -> Result<Claim<IngestedAsset>, AppError> {
        let new_key = asset_key(&self.bucket_prefix, &id, extension);

        let copied = match self.storage.get(&asset.storage_path).await {
            Ok(bytes) => {
                match self
                    .storage
                    .put_if_absent(&new_key, bytes, content_type_for_extension(extension))
                    .await
                {
                    Ok(_) => true,
                    Err(StorageError::AlreadyExists(_)) => return Ok(Claim::Taken),
                    Err(e) => return Err(e.into()),
                }
            }
            Err(StorageError::NotFound(_)) => {
                tracing::warn!(
                    asset.id = %asset.id,
                    storage_path = %asset.storage_path,
                    "Stored object missing, updating record only"
                );
                false
            }
            Err(e) => return Err(e.into()),
        };

        let url = self.storage.public_url(&new_key);
        match self
            .store
            .update_catalog_id(asset.id, &id.to_string(), &new_key, &url)
            .await
        {
            Ok(updated) => Ok(Claim::Committed(updated)),
            Err(PersistenceError::DuplicateCatalogId(_)) => {
                if copied {
                    if let Err(e) = self.storage.delete(&new_key).await {
                        tracing::warn!(key = %new_key, error = %e, "Failed to remove copied object");
                    }
                }
                Ok(Claim::Taken)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn remove_old_object(&self, asset: &IngestedAsset) {
        if let Err(e) = self.storage.delete(&asset.storage_path).await {
            tracing::warn!(
                storage_path = %asset.storage_path,
                error = %e,
                "Failed to remove legacy object"
            );
        }
    }
}

fn migrated_id(asset: &IngestedAsset) -> Result<CatalogId, AppError> {
    let legacy = LegacyCatalogId::parse(&asset.catalog_id)
        .map_err(|e| AppError::Validation(e.to_string()))?;
    Ok(legacy.migrate(asset.migration_date()))
}

fn stored_extension(asset: &IngestedAsset) -> String {
    asset
        .storage_path
        .rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| match asset.media_type {
            MediaType::Image => "webp".to_string(),
            MediaType::Video => "mp4".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::new_asset;
    use archiva_db::InMemoryAssetStore;
    use archiva_storage::LocalStorage;
    use bytes::Bytes;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    struct Fixture {
        _dir: TempDir,
        store: Arc<InMemoryAssetStore>,
        storage: Arc<LocalStorage>,
        migration: CatalogMigration,
    }

    async fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(
            LocalStorage::new(dir.path(), "http://localhost:3000/media".to_string())
                .await
                .unwrap(),
        );
        let store = Arc::new(InMemoryAssetStore::new());
        let allocator = CatalogAllocator::new(store.clone(), "LMSY", 5);
        let migration =
            CatalogMigration::new(store.clone(), storage.clone(), allocator, "magazines");
        Fixture {
            _dir: dir,
            store,
            storage,
            migration,
        }
    }

    async fn seed_legacy(f: &Fixture, catalog_id: &str, hash: &str, event_date: NaiveDate) -> Uuid {
        let key = format!("magazines/{}/{}.webp", event_date.format("%Y"), catalog_id);
        f.storage
            .put(&key, Bytes::from(hash.to_string()), "image/webp")
            .await
            .unwrap();
        let mut asset = new_asset(catalog_id, hash);
        asset.event_date = Some(event_date);
        asset.storage_path = key;
        f.store.insert(&asset).await.unwrap().id
    }

    #[tokio::test]
    async fn dry_run_reports_without_writing() {
        let f = fixture().await;
        let id = seed_legacy(&f, "LMSY-ED-2023-004", "a", date(2023, 3, 9)).await;
        f.store
            .insert(&new_asset("LMSY-G-20240101-001", "b"))
            .await
            .unwrap();

        let report = f.migration.run(true).await.unwrap();

        assert!(report.dry_run);
        assert_eq!(report.total_records, 2);
        assert_eq!(report.legacy_ids, 1);
        assert_eq!(report.migrated, 1);
        assert_eq!(report.changes[0].to, "LMSY-MAG-20230309-004");
        let untouched = f.store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(untouched.catalog_id, "LMSY-ED-2023-004");
    }

    #[tokio::test]
    async fn migration_moves_record_and_object() {
        let f = fixture().await;
        let id = seed_legacy(&f, "LMSY-G-2024-017", "a", date(2024, 6, 2)).await;

        let report = f.migration.run(false).await.unwrap();
        assert_eq!(report.migrated, 1);
        assert_eq!(report.failed, 0);

        let asset = f.store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(asset.catalog_id, "LMSY-G-20240602-017");
        assert_eq!(asset.storage_path, "magazines/2024/LMSY-G-20240602-017.webp");
        assert!(f.storage.exists(&asset.storage_path).await.unwrap());
        assert!(!f
            .storage
            .exists("magazines/2024/LMSY-G-2024-017.webp")
            .await
            .unwrap());
        assert!(f.store.list_legacy().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn conflicting_target_gets_next_sequence() {
        let f = fixture().await;
        f.store
            .insert(&new_asset("LMSY-G-20240602-017", "holder"))
            .await
            .unwrap();
        let id = seed_legacy(&f, "LMSY-G-2024-017", "a", date(2024, 6, 2)).await;

        let report = f.migration.run(false).await.unwrap();

        assert_eq!(report.migrated, 1);
        let asset = f.store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(asset.catalog_id, "LMSY-G-20240602-018");
    }

    #[tokio::test]
    async fn missing_object_still_updates_record() {
        let f = fixture().await;
        let mut asset = new_asset("LMSY-G-2022-003", "a");
        asset.event_date = NaiveDate::from_ymd_opt(2022, 1, 15);
        let id = f.store.insert(&asset).await.unwrap().id;

        let report = f.migration.run(false).await.unwrap();

        assert_eq!(report.migrated, 1);
        let migrated = f.store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(migrated.catalog_id, "LMSY-G-20220115-003");
    }
}
