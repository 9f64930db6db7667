//! Archiva Services Layer
//!
//! Pipeline stages that talk to the outside world or coordinate shared state:
//! fetching remote media, allocating catalog ids against the metadata store,
//! the dedup pre-check, and machine translation. The API crate composes them
//! into the ingestion flow.

pub mod catalog;
pub mod fetcher;
pub mod translation;

pub use catalog::{AllocationError, CatalogAllocator, Claim, DedupGate, DedupOutcome};
pub use fetcher::{
    media_type_for_extension, referer_for, resolve_extension, validate_media_url, FetchError,
    FetchOptions, FetchedMedia, MediaFetcher,
};
pub use translation::{
    extract_json_object, ExtractionError, OpenRouterTranslator, TextField, TranslationContext,
    TranslationError, Translator,
};
