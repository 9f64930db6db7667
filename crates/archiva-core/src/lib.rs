//! Archiva Core Library
//!
//! Domain models, the error taxonomy and configuration shared by every
//! component of the ingestion pipeline.

pub mod config;
pub mod error;
pub mod models;
pub mod storage_types;

pub use config::{BaseConfig, Config, IngestConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{
    detect_platform, normalize_source_url, parse_event_date, resolve_category, AssetMetadata,
    CatalogId, CatalogIdError, CatalogRole, IngestRequest, IngestResponse,
    IngestedAsset, IngestionStage, LegacyCatalogId, Locale, LocalizedText, MediaType, NewAsset,
    ParsedCatalogId, TranslationRecord, TranslationStatus,
};
pub use storage_types::StorageBackend;
