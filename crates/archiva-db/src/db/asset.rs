use archiva_core::{
    AssetMetadata, IngestedAsset, IngestionStage, LocalizedText, MediaType, NewAsset,
    TranslationRecord, TranslationStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use super::error::{classify_write_error, PersistenceError, PersistenceResult};
use super::store::AssetStore;

const ASSET_COLUMNS: &str = "id, catalog_id, event_date, source_url, source_platform, \
    source_post_id, content_hash, storage_path, storage_url, media_type, width, height, \
    duration_seconds, size_bytes, format, blur_data_url, title, description, tags, \
    translation_status, title_translations, description_translations, translation_model, \
    translation_error, ingestion_stage, notes, created_at, updated_at";

/// Row type for the assets table (for FromRow).
#[derive(Debug, sqlx::FromRow)]
struct AssetRow {
    id: Uuid,
    catalog_id: String,
    event_date: Option<NaiveDate>,
    source_url: Option<String>,
    source_platform: String,
    source_post_id: Option<String>,
    content_hash: String,
    storage_path: String,
    storage_url: String,
    media_type: String,
    width: Option<i32>,
    height: Option<i32>,
    duration_seconds: Option<f64>,
    size_bytes: i64,
    format: String,
    blur_data_url: Option<String>,
    title: Option<String>,
    description: Option<String>,
    tags: Vec<String>,
    translation_status: String,
    title_translations: Json<LocalizedText>,
    description_translations: Json<LocalizedText>,
    translation_model: Option<String>,
    translation_error: Option<String>,
    ingestion_stage: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AssetRow> for IngestedAsset {
    type Error = PersistenceError;

    fn try_from(row: AssetRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let corrupt = move |e: anyhow::Error| PersistenceError::CorruptRecord(format!("{}: {}", id, e));

        let media_type: MediaType = row.media_type.parse().map_err(corrupt)?;
        let translation_status: TranslationStatus =
            row.translation_status.parse().map_err(corrupt)?;
        let ingestion_stage: IngestionStage = row.ingestion_stage.parse().map_err(corrupt)?;

        Ok(IngestedAsset {
            id,
            catalog_id: row.catalog_id,
            event_date: row.event_date,
            source_url: row.source_url,
            source_platform: row.source_platform,
            source_post_id: row.source_post_id,
            content_hash: row.content_hash,
            storage_path: row.storage_path,
            storage_url: row.storage_url,
            media_type,
            metadata: AssetMetadata {
                width: row.width.and_then(|w| u32::try_from(w).ok()),
                height: row.height.and_then(|h| u32::try_from(h).ok()),
                duration_seconds: row.duration_seconds,
                size_bytes: u64::try_from(row.size_bytes).unwrap_or_default(),
                format: row.format,
            },
            blur_data_url: row.blur_data_url,
            title: row.title,
            description: row.description,
            tags: row.tags,
            translation_status,
            translation: TranslationRecord {
                title_by_locale: row.title_translations.0,
                description_by_locale: row.description_translations.0,
                model: row.translation_model,
                error: row.translation_error,
            },
            ingestion_stage,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Postgres-backed [`AssetStore`].
#[derive(Clone)]
pub struct AssetRepository {
    pool: PgPool,
}

impl AssetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one(
        &self,
        column: &'static str,
        value: &str,
    ) -> PersistenceResult<Option<IngestedAsset>> {
        let query = format!("SELECT {} FROM assets WHERE {} = $1", ASSET_COLUMNS, column);
        let row = sqlx::query_as::<Postgres, AssetRow>(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        row.map(IngestedAsset::try_from).transpose()
    }
}

#[async_trait]
impl AssetStore for AssetRepository {
    #[tracing::instrument(
        skip(self, asset),
        fields(db.table = "assets", db.operation = "insert", catalog_id = %asset.catalog_id)
    )]
    async fn insert(&self, asset: &NewAsset) -> PersistenceResult<IngestedAsset> {
        let title_translations = LocalizedText::default();
        let description_translations = LocalizedText::default();

        let query = format!(
            r#"
            INSERT INTO assets (
                id, catalog_id, event_date, source_url, source_platform, source_post_id,
                content_hash, storage_path, storage_url, media_type, width, height,
                duration_seconds, size_bytes, format, blur_data_url, title, description, tags,
                translation_status, title_translations, description_translations,
                ingestion_stage, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                    $17, $18, $19, $20, $21, $22, $23, $24)
            RETURNING {}
            "#,
            ASSET_COLUMNS
        );

        let result = sqlx::query_as::<Postgres, AssetRow>(&query)
            .bind(Uuid::new_v4())
            .bind(&asset.catalog_id)
            .bind(asset.event_date)
            .bind(&asset.source_url)
            .bind(&asset.source_platform)
            .bind(&asset.source_post_id)
            .bind(&asset.content_hash)
            .bind(&asset.storage_path)
            .bind(&asset.storage_url)
            .bind(asset.media_type.as_str())
            .bind(asset.metadata.width.and_then(|w| i32::try_from(w).ok()))
            .bind(asset.metadata.height.and_then(|h| i32::try_from(h).ok()))
            .bind(asset.metadata.duration_seconds)
            .bind(i64::try_from(asset.metadata.size_bytes).unwrap_or(i64::MAX))
            .bind(&asset.metadata.format)
            .bind(&asset.blur_data_url)
            .bind(&asset.title)
            .bind(&asset.description)
            .bind(&asset.tags)
            .bind(asset.translation_status.as_str())
            .bind(Json(&title_translations))
            .bind(Json(&description_translations))
            .bind(asset.ingestion_stage.as_str())
            .bind(&asset.notes)
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(row) => IngestedAsset::try_from(row),
            Err(e) => Err(classify_write_error(e, &asset.content_hash, &asset.catalog_id)),
        }
    }

    #[tracing::instrument(skip(self), fields(db.table = "assets", db.operation = "select", db.record_id = %id))]
    async fn find_by_id(&self, id: Uuid) -> PersistenceResult<Option<IngestedAsset>> {
        let query = format!("SELECT {} FROM assets WHERE id = $1", ASSET_COLUMNS);
        let row = sqlx::query_as::<Postgres, AssetRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(IngestedAsset::try_from).transpose()
    }

    #[tracing::instrument(skip(self), fields(db.table = "assets", db.operation = "select"))]
    async fn find_by_content_hash(
        &self,
        content_hash: &str,
    ) -> PersistenceResult<Option<IngestedAsset>> {
        self.find_one("content_hash", content_hash).await
    }

    #[tracing::instrument(skip(self), fields(db.table = "assets", db.operation = "select"))]
    async fn find_by_catalog_id(
        &self,
        catalog_id: &str,
    ) -> PersistenceResult<Option<IngestedAsset>> {
        self.find_one("catalog_id", catalog_id).await
    }

    #[tracing::instrument(skip(self), fields(db.table = "assets", db.operation = "select"))]
    async fn max_sequence(&self, scope_key: &str) -> PersistenceResult<Option<u16>> {
        // Exactly three trailing digits: legacy ids never share a scope key.
        let pattern = format!("{}___", scope_key);
        let max = sqlx::query_scalar::<Postgres, Option<i32>>(
            r#"
            SELECT MAX(CAST(RIGHT(catalog_id, 3) AS INTEGER))
            FROM assets
            WHERE catalog_id LIKE $1 AND RIGHT(catalog_id, 3) ~ '^[0-9]{3}$'
            "#,
        )
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        Ok(max.and_then(|m| u16::try_from(m).ok()))
    }

    #[tracing::instrument(
        skip(self, translation),
        fields(db.table = "assets", db.operation = "update", db.record_id = %id)
    )]
    async fn record_translation(
        &self,
        id: Uuid,
        status: TranslationStatus,
        translation: &TranslationRecord,
        stage: IngestionStage,
    ) -> PersistenceResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE assets
            SET translation_status = $2,
                title_translations = $3,
                description_translations = $4,
                translation_model = $5,
                translation_error = $6,
                ingestion_stage = $7,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(Json(&translation.title_by_locale))
        .bind(Json(&translation.description_by_locale))
        .bind(&translation.model)
        .bind(&translation.error)
        .bind(stage.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::NotFound(id));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "assets", db.operation = "select"))]
    async fn list_legacy(&self) -> PersistenceResult<Vec<IngestedAsset>> {
        let query = format!(
            "SELECT {} FROM assets WHERE catalog_id ~ '^[A-Z]+-[A-Z]+-[0-9]{{4}}-[0-9]{{3}}$' \
             ORDER BY created_at ASC",
            ASSET_COLUMNS
        );
        let rows = sqlx::query_as::<Postgres, AssetRow>(&query)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(IngestedAsset::try_from).collect()
    }

    #[tracing::instrument(skip(self), fields(db.table = "assets", db.operation = "count"))]
    async fn count(&self) -> PersistenceResult<i64> {
        let count = sqlx::query_scalar::<Postgres, i64>("SELECT COUNT(*) FROM assets")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    #[tracing::instrument(skip(self), fields(db.table = "assets", db.operation = "update", db.record_id = %id))]
    async fn update_catalog_id(
        &self,
        id: Uuid,
        catalog_id: &str,
        storage_path: &str,
        storage_url: &str,
    ) -> PersistenceResult<IngestedAsset> {
        let query = format!(
            r#"
            UPDATE assets
            SET catalog_id = $2, storage_path = $3, storage_url = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            ASSET_COLUMNS
        );
        let result = sqlx::query_as::<Postgres, AssetRow>(&query)
            .bind(id)
            .bind(catalog_id)
            .bind(storage_path)
            .bind(storage_url)
            .fetch_optional(&self.pool)
            .await;

        match result {
            Ok(Some(row)) => IngestedAsset::try_from(row),
            Ok(None) => Err(PersistenceError::NotFound(id)),
            Err(e) => Err(classify_write_error(e, "", catalog_id)),
        }
    }

    async fn ping(&self) -> PersistenceResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
