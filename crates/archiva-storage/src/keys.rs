//! Canonical key grammar shared by all backends.
//!
//! `{bucket_prefix}/{year}/{catalog_id}.{ext}`

use archiva_core::CatalogId;

use crate::traits::{StorageError, StorageResult};

/// Key of the canonical object for `catalog_id`.
pub fn asset_key(bucket_prefix: &str, catalog_id: &CatalogId, extension: &str) -> String {
    format!(
        "{}/{}/{}.{}",
        bucket_prefix.trim_matches('/'),
        catalog_id.year(),
        catalog_id,
        extension.trim_start_matches('.').to_lowercase()
    )
}

/// Recover the catalog id and extension from a canonical key.
///
/// Only the file name is inspected, so objects uploaded under a different year
/// partition are still recognised. Returns `None` for anything that does not
/// follow the current grammar (legacy names, thumbnails, stray files).
pub fn parse_asset_key(key: &str) -> Option<(CatalogId, String)> {
    let file_name = key.rsplit('/').next()?;
    let (stem, extension) = file_name.rsplit_once('.')?;
    if extension.is_empty() || !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    let catalog_id = CatalogId::parse(stem).ok()?;
    Some((catalog_id, extension.to_lowercase()))
}

/// Reject keys that could escape the bucket root.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() || key.contains("..") || key.starts_with('/') || key.contains('\\') {
        return Err(StorageError::InvalidKey(format!(
            "Storage key '{}' contains invalid characters",
            key
        )));
    }
    Ok(())
}
