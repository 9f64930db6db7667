//! Archiva DB Library
//!
//! Metadata persistence for ingested assets: the `AssetStore` seam used by the
//! pipeline, its Postgres implementation and the error classification that turns
//! constraint violations into domain outcomes.

pub mod db;

pub use db::{
    classify_write_error, AssetRepository, AssetStore, PersistenceError, PersistenceResult,
    CATALOG_ID_CONSTRAINT, CONTENT_HASH_CONSTRAINT,
};
#[cfg(any(test, feature = "test-helpers"))]
pub use db::InMemoryAssetStore;
