pub mod asset;
pub mod catalog_id;
pub mod ingest;
pub mod translation;

pub use asset::{AssetMetadata, IngestedAsset, IngestionStage, MediaType, NewAsset};
pub use catalog_id::{
    parse_any, resolve_category, CatalogId, CatalogIdError, CatalogRole, LegacyCatalogId,
    ParsedCatalogId,
};
pub use ingest::{
    detect_platform, normalize_source_url, parse_event_date, IngestRequest, IngestResponse,
};
pub use translation::{Locale, LocalizedText, TranslationRecord, TranslationStatus};
