//! Wire types of the ingestion endpoint and the input normalisation rules.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use url::Url;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::asset::{IngestionStage, MediaType};
use super::catalog_id::CatalogRole;

/// Ingestion request body.
///
/// `sourceUrl` and `sourcePlatform` default to empty so that a missing field is
/// reported through validation like any other bad input.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    #[serde(default)]
    #[validate(url(message = "sourceUrl must be an absolute URL"))]
    pub source_url: String,

    /// Platform name, or `auto` to infer it from `sourceUrl`.
    #[serde(default)]
    #[validate(length(min = 1, max = 64, message = "sourcePlatform is required"))]
    pub source_platform: String,

    #[validate(length(max = 256))]
    pub source_post_id: Option<String>,

    /// Direct media link. When absent, `sourceUrl` is fetched as the media.
    #[validate(url(message = "mediaUrl must be an absolute URL"))]
    pub media_url: Option<String>,

    #[validate(length(max = 1000))]
    pub title: Option<String>,

    #[validate(length(max = 10000))]
    pub description: Option<String>,

    /// `YYYY-MM-DD`; defaults to the ingestion day.
    pub event_date: Option<String>,

    #[validate(length(max = 50))]
    pub tags: Option<Vec<String>>,

    /// Category code (`MAG`) or collection kind (`editorial`).
    pub category: Option<String>,

    pub role: Option<CatalogRole>,

    /// Hint used when the response carries no usable content type.
    pub media_type: Option<MediaType>,
}

impl IngestRequest {
    /// URL the media bytes are fetched from.
    pub fn media_source(&self) -> &str {
        self.media_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or(&self.source_url)
    }

    /// Text to translate, trimmed; `None` when blank.
    pub fn title_text(&self) -> Option<&str> {
        self.title.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    pub fn description_text(&self) -> Option<&str> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Ingestion response body. `stage` is always definitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub success: bool,
    pub asset_id: Option<Uuid>,
    pub stage: IngestionStage,
    pub is_duplicate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IngestResponse {
    pub fn created(asset_id: Uuid, catalog_id: String, stage: IngestionStage) -> Self {
        Self {
            success: true,
            asset_id: Some(asset_id),
            stage,
            is_duplicate: false,
            catalog_id: Some(catalog_id),
            error: None,
        }
    }

    pub fn duplicate(existing_id: Option<Uuid>, catalog_id: Option<String>) -> Self {
        Self {
            success: true,
            asset_id: existing_id,
            stage: IngestionStage::Duplicate,
            is_duplicate: true,
            catalog_id,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            asset_id: None,
            stage: IngestionStage::Failed,
            is_duplicate: false,
            catalog_id: None,
            error: Some(error.into()),
        }
    }
}

/// Drop the query string and fragment of a URL.
pub fn normalize_source_url(url: &str) -> String {
    let trimmed = url.trim();
    let end = trimmed.find(['?', '#']).unwrap_or(trimmed.len());
    trimmed[..end].to_string()
}

/// Parse a strict `YYYY-MM-DD` event date.
pub fn parse_event_date(raw: &str) -> Result<NaiveDate, String> {
    let raw = raw.trim();
    let well_formed = raw.len() == 10
        && raw.char_indices().all(|(i, c)| match i {
            4 | 7 => c == '-',
            _ => c.is_ascii_digit(),
        });
    if !well_formed {
        return Err(format!("eventDate '{}' must use the format YYYY-MM-DD", raw));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| format!("eventDate '{}' is not a valid calendar date", raw))
}

/// Infer the source platform from the host of a post URL.
pub fn detect_platform(url: &str) -> &'static str {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return "manual";
    };
    let host = parsed
        .host_str()
        .unwrap_or_default()
        .trim_end_matches('.')
        .to_lowercase();

    let is = |domain: &str| host == domain || host.ends_with(&format!(".{}", domain));

    if is("twitter.com") || is("x.com") {
        "twitter"
    } else if is("instagram.com") {
        "instagram"
    } else if is("weibo.com") || is("weibo.cn") {
        "weibo"
    } else if is("xiaohongshu.com") || is("xhslink.com") {
        "xiaohongshu"
    } else if is("youtube.com") || is("youtu.be") {
        "youtube"
    } else if is("tiktok.com") {
        "tiktok"
    } else {
        "manual"
    }
}
