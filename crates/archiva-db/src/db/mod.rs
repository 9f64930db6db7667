//! Database repositories for the data access layer
//
// Persistence errors and constraint classification
pub mod error;
//
// Repository trait used by the pipeline
pub mod store;
//
// Postgres implementation
pub mod asset;
//
// In-memory implementation for tests
#[cfg(any(test, feature = "test-helpers"))]
pub mod memory;

pub use asset::AssetRepository;
pub use error::{
    classify_write_error, PersistenceError, PersistenceResult, CATALOG_ID_CONSTRAINT,
    CONTENT_HASH_CONSTRAINT,
};
#[cfg(any(test, feature = "test-helpers"))]
pub use memory::InMemoryAssetStore;
pub use store::AssetStore;
