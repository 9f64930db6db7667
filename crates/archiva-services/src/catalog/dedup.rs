use std::sync::Arc;

use archiva_core::IngestedAsset;
use archiva_db::{AssetStore, PersistenceResult};

#[derive(Debug, Clone, PartialEq)]
pub enum DedupOutcome {
    Unique,
    Duplicate(Box<IngestedAsset>),
}

impl DedupOutcome {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, DedupOutcome::Duplicate(_))
    }
}

/// Pre-check on content hash, run before any transcoding or upload.
///
/// Two identical uploads racing each other can both pass; the unique
/// constraint on `content_hash` catches the loser at insert time.
#[derive(Clone)]
pub struct DedupGate {
    store: Arc<dyn AssetStore>,
}

impl DedupGate {
    pub fn new(store: Arc<dyn AssetStore>) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self))]
    pub async fn check(&self, content_hash: &str) -> PersistenceResult<DedupOutcome> {
        match self.store.find_by_content_hash(content_hash).await? {
            Some(existing) => {
                tracing::info!(
                    asset.id = %existing.id,
                    catalog_id = %existing.catalog_id,
                    "Content already archived"
                );
                Ok(DedupOutcome::Duplicate(Box::new(existing)))
            }
            None => Ok(DedupOutcome::Unique),
        }
    }
}
