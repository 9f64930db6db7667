use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::catalog_id::{parse_any, CatalogIdError, ParsedCatalogId};
use super::translation::{TranslationRecord, TranslationStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
        }
    }

    /// Family of a MIME type, ignoring parameters.
    pub fn from_content_type(content_type: &str) -> Option<MediaType> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        if essence.starts_with("image/") {
            Some(MediaType::Image)
        } else if essence.starts_with("video/") {
            Some(MediaType::Video)
        } else {
            None
        }
    }
}

impl Display for MediaType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(MediaType::Image),
            "video" => Ok(MediaType::Video),
            other => Err(anyhow::anyhow!("Invalid media type: {}", other)),
        }
    }
}

/// Persisted lifecycle stage of an asset.
///
/// The request-scoped steps before persistence (fetched, hashed, ...) are never
/// stored; a record starts life in `Translating`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum IngestionStage {
    Translating,
    Ready,
    Duplicate,
    Failed,
}

impl IngestionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestionStage::Translating => "translating",
            IngestionStage::Ready => "ready",
            IngestionStage::Duplicate => "duplicate",
            IngestionStage::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, IngestionStage::Translating)
    }
}

impl Display for IngestionStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IngestionStage {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "translating" => Ok(IngestionStage::Translating),
            "ready" => Ok(IngestionStage::Ready),
            "duplicate" => Ok(IngestionStage::Duplicate),
            "failed" => Ok(IngestionStage::Failed),
            other => Err(anyhow::anyhow!("Invalid ingestion stage: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssetMetadata {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration_seconds: Option<f64>,
    pub size_bytes: u64,
    pub format: String,
}

/// One archived piece of media.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngestedAsset {
    pub id: Uuid,
    /// Rendered catalog id; legacy-grammar ids may still appear until migrated.
    pub catalog_id: String,
    pub event_date: Option<NaiveDate>,
    /// Normalized: query and fragment stripped. Absent for reconciled records.
    pub source_url: Option<String>,
    pub source_platform: String,
    pub source_post_id: Option<String>,
    pub content_hash: String,
    pub storage_path: String,
    pub storage_url: String,
    pub media_type: MediaType,
    pub metadata: AssetMetadata,
    pub blur_data_url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub translation_status: TranslationStatus,
    pub translation: TranslationRecord,
    pub ingestion_stage: IngestionStage,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IngestedAsset {
    pub fn parsed_catalog_id(&self) -> Result<ParsedCatalogId, CatalogIdError> {
        parse_any(&self.catalog_id)
    }

    /// Date used when a legacy id is rewritten: event date, else creation day.
    pub fn migration_date(&self) -> NaiveDate {
        self.event_date
            .unwrap_or_else(|| self.created_at.date_naive())
    }
}

/// Values needed to insert a new asset. Ids and timestamps are assigned on insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAsset {
    pub catalog_id: String,
    pub event_date: Option<NaiveDate>,
    pub source_url: Option<String>,
    pub source_platform: String,
    pub source_post_id: Option<String>,
    pub content_hash: String,
    pub storage_path: String,
    pub storage_url: String,
    pub media_type: MediaType,
    pub metadata: AssetMetadata,
    pub blur_data_url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub translation_status: TranslationStatus,
    pub ingestion_stage: IngestionStage,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_type_from_content_type_ignores_parameters() {
        assert_eq!(
            MediaType::from_content_type("image/jpeg; charset=binary"),
            Some(MediaType::Image)
        );
        assert_eq!(MediaType::from_content_type("VIDEO/MP4"), Some(MediaType::Video));
        assert_eq!(MediaType::from_content_type("text/html"), None);
        assert_eq!(MediaType::from_content_type(""), None);
    }

    #[test]
    fn only_translating_is_non_terminal() {
        assert!(!IngestionStage::Translating.is_terminal());
        assert!(IngestionStage::Ready.is_terminal());
        assert!(IngestionStage::Duplicate.is_terminal());
        assert!(IngestionStage::Failed.is_terminal());
    }

    #[test]
    fn stage_strings_parse_back() {
        for stage in ["translating", "ready", "duplicate", "failed"] {
            assert_eq!(stage.parse::<IngestionStage>().unwrap().as_str(), stage);
        }
        assert!("fetched".parse::<IngestionStage>().is_err());
    }
}
