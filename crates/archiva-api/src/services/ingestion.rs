//! Ingestion orchestrator
//!
//! One request runs strictly in order: validate, fetch, hash, dedup, transcode,
//! allocate, store, persist, then hand the asset to enrichment. Nothing touches
//! the network or storage before validation passes. Once the record exists the
//! request has succeeded; enrichment outcomes are written back later.
//!
//! The object upload and the insert are not atomic. A failed insert removes the
//! object it just wrote; anything left behind by a crash is picked up by the
//! reconciliation sweep.

use std::sync::Arc;

use archiva_core::{
    detect_platform, normalize_source_url, parse_event_date, resolve_category, AppError, CatalogId,
    CatalogRole, Config, IngestRequest, IngestedAsset, IngestionStage, MediaType, NewAsset,
    TranslationStatus,
};
use archiva_db::{AssetStore, PersistenceError};
use archiva_processing::{content_hash, AssetTranscoder, TranscodedAsset};
use archiva_services::{
    CatalogAllocator, Claim, DedupGate, DedupOutcome, FetchOptions, FetchedMedia, MediaFetcher,
};
use archiva_storage::{asset_key, Storage, StorageError};
use archiva_worker::{EnrichmentJob, EnrichmentWorker};
use chrono::{NaiveDate, Utc};
use validator::Validate;

const AUTO_PLATFORM: &str = "auto";

#[derive(Debug, Clone)]
pub enum IngestOutcome {
    /// New asset, persisted in the `translating` stage.
    Created(IngestedAsset),
    /// The content was already archived as this asset.
    Duplicate(IngestedAsset),
}

/// Request input after validation and normalisation.
#[derive(Debug, Clone)]
struct ValidatedRequest {
    source_url: String,
    media_url: String,
    platform: String,
    source_post_id: Option<String>,
    event_date: NaiveDate,
    category: String,
    role: CatalogRole,
    media_type_hint: Option<MediaType>,
    title: Option<String>,
    description: Option<String>,
    tags: Vec<String>,
}

impl ValidatedRequest {
    fn from_request(request: IngestRequest) -> Result<Self, AppError> {
        request.validate()?;

        let platform = request.source_platform.trim().to_lowercase();
        if platform.is_empty() {
            return Err(AppError::Validation("sourcePlatform is required".to_string()));
        }
        let platform = if platform == AUTO_PLATFORM {
            detect_platform(&request.source_url).to_string()
        } else {
            platform
        };

        let event_date = match request.event_date.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => parse_event_date(raw).map_err(AppError::Validation)?,
            _ => Utc::now().date_naive(),
        };

        let category = resolve_category(request.category.as_deref())
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let tags = request
            .tags
            .clone()
            .unwrap_or_default()
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        Ok(Self {
            source_url: normalize_source_url(&request.source_url),
            media_url: request.media_source().trim().to_string(),
            platform,
            source_post_id: request.source_post_id.clone(),
            event_date,
            category,
            role: request.role.unwrap_or_default(),
            media_type_hint: request.media_type,
            title: request.title_text().map(str::to_string),
            description: request.description_text().map(str::to_string),
            tags,
        })
    }

    fn new_asset(
        &self,
        catalog_id: &CatalogId,
        hash: &str,
        media_type: MediaType,
        media: &TranscodedAsset,
        storage_path: String,
        storage_url: String,
    ) -> NewAsset {
        NewAsset {
            catalog_id: catalog_id.to_string(),
            event_date: Some(self.event_date),
            source_url: Some(self.source_url.clone()),
            source_platform: self.platform.clone(),
            source_post_id: self.source_post_id.clone(),
            content_hash: hash.to_string(),
            storage_path,
            storage_url,
            media_type,
            metadata: media.metadata.clone(),
            blur_data_url: media.blur_data_url.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            tags: self.tags.clone(),
            translation_status: TranslationStatus::Pending,
            ingestion_stage: IngestionStage::Translating,
            notes: None,
        }
    }
}

/// Everything needed to turn one fetched item into a persisted asset.
struct Prepared<'a> {
    request: &'a ValidatedRequest,
    hash: &'a str,
    media_type: MediaType,
    media: &'a TranscodedAsset,
}

#[derive(Clone)]
pub struct IngestionService {
    store: Arc<dyn AssetStore>,
    storage: Arc<dyn Storage>,
    fetcher: MediaFetcher,
    fetch_options: FetchOptions,
    transcoder: AssetTranscoder,
    dedup: DedupGate,
    allocator: CatalogAllocator,
    enrichment: EnrichmentWorker,
    bucket_prefix: String,
}

impl IngestionService {
    pub fn new(
        config: &Config,
        store: Arc<dyn AssetStore>,
        storage: Arc<dyn Storage>,
        transcoder: AssetTranscoder,
        allocator: CatalogAllocator,
        enrichment: EnrichmentWorker,
    ) -> Result<Self, AppError> {
        let fetcher = MediaFetcher::new(config.fetch_allow_private_hosts())?;
        Ok(Self {
            dedup: DedupGate::new(store.clone()),
            store,
            storage,
            fetcher,
            fetch_options: FetchOptions::from_config(config),
            transcoder,
            allocator,
            enrichment,
            bucket_prefix: config.bucket_prefix().to_string(),
        })
    }

    #[tracing::instrument(
        skip(self, request),
        fields(source_platform = %request.source_platform, source_url = %normalize_source_url(&request.source_url))
    )]
    pub async fn ingest(&self, request: IngestRequest) -> Result<IngestOutcome, AppError> {
        let start = std::time::Instant::now();
        let request = ValidatedRequest::from_request(request)?;

        let fetched = self
            .fetcher
            .fetch(&request.media_url, &self.fetch_options)
            .await?;
        let media_type = fetched
            .media_type()
            .or(request.media_type_hint)
            .ok_or_else(|| {
                AppError::UnsupportedMedia(format!(
                    "content type '{}' is neither image nor video",
                    fetched.content_type
                ))
            })?;

        let hash = content_hash(&fetched.bytes);
        if let DedupOutcome::Duplicate(existing) = self.dedup.check(&hash).await? {
            tracing::info!(
                asset.id = %existing.id,
                catalog_id = %existing.catalog_id,
                content_hash = %hash,
                "Duplicate content, skipping ingestion"
            );
            return Ok(IngestOutcome::Duplicate(*existing));
        }

        let extension = source_extension(&fetched, media_type);
        let media = self
            .transcoder
            .transcode(fetched.bytes, media_type, &extension)
            .await?;

        let prepared = Prepared {
            request: &request,
            hash: &hash,
            media_type,
            media: &media,
        };
        let prepared = &prepared;
        let (catalog_id, outcome) = self
            .allocator
            .allocate_and_commit(
                &request.category,
                request.event_date,
                request.role,
                move |id| self.commit(id, prepared),
            )
            .await?;

        match outcome {
            IngestOutcome::Created(asset) => {
                tracing::info!(
                    asset.id = %asset.id,
                    catalog_id = %catalog_id,
                    content_hash = %hash,
                    size_bytes = asset.metadata.size_bytes,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Asset ingested"
                );
                self.enrichment.spawn(EnrichmentJob {
                    asset_id: asset.id,
                    platform: asset.source_platform.clone(),
                    title: asset.title.clone(),
                    description: asset.description.clone(),
                });
                Ok(IngestOutcome::Created(asset))
            }
            duplicate => Ok(duplicate),
        }
    }

    /// Claim `id` in the object store, then in the database.
    async fn commit(
        &self,
        id: CatalogId,
        prepared: &Prepared<'_>,
    ) -> Result<Claim<IngestOutcome>, AppError> {
        let media = prepared.media;
        let key = asset_key(&self.bucket_prefix, &id, &media.extension);

        let url = match self
            .storage
            .put_if_absent(&key, media.bytes.clone(), &media.content_type)
            .await
        {
            Ok(url) => url,
            Err(StorageError::AlreadyExists(_)) => {
                tracing::debug!(key = %key, "Object already present at catalog key");
                return Ok(Claim::Taken);
            }
            Err(e) => return Err(e.into()),
        };

        let new_asset = prepared.request.new_asset(
            &id,
            prepared.hash,
            prepared.media_type,
            media,
            key.clone(),
            url,
        );

        match self.store.insert(&new_asset).await {
            Ok(asset) => Ok(Claim::Committed(IngestOutcome::Created(asset))),
            Err(PersistenceError::DuplicateCatalogId(_)) => {
                // A reconciliation backfill may already point at this object.
                match self.store.find_by_catalog_id(&new_asset.catalog_id).await {
                    Ok(Some(holder)) if holder.storage_path == key => {
                        tracing::warn!(
                            asset.id = %holder.id,
                            key = %key,
                            "Catalog id claimed by a record for this object, keeping it"
                        );
                    }
                    _ => self.discard(&key).await,
                }
                Ok(Claim::Taken)
            }
            Err(PersistenceError::DuplicateContentHash(_)) => {
                // A concurrent request archived the same bytes first.
                self.discard(&key).await;
                let existing = self
                    .store
                    .find_by_content_hash(prepared.hash)
                    .await?
                    .ok_or_else(|| {
                        AppError::Persistence(format!(
                            "content hash {} reported as duplicate but not found",
                            prepared.hash
                        ))
                    })?;
                tracing::info!(
                    asset.id = %existing.id,
                    content_hash = %prepared.hash,
                    "Duplicate content detected at insert"
                );
                Ok(Claim::Committed(IngestOutcome::Duplicate(existing)))
            }
            Err(e) => {
                self.discard(&key).await;
                Err(e.into())
            }
        }
    }

    async fn discard(&self, key: &str) {
        if let Err(e) = self.storage.delete(key).await {
            tracing::warn!(key = %key, error = %e, "Failed to remove uncommitted object");
        }
    }
}

/// Extension of the fetched media, defaulting by family.
fn source_extension(fetched: &FetchedMedia, media_type: MediaType) -> String {
    fetched.extension.clone().unwrap_or_else(|| {
        match media_type {
            MediaType::Image => "jpg",
            MediaType::Video => "mp4",
        }
        .to_string()
    })
}
