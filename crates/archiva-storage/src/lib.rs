//! Archiva Storage Library
//!
//! Object Store Gateway: the `Storage` trait and its S3 and local filesystem
//! backends.
//!
//! # Storage key format
//!
//! Asset keys are derived from the catalog id alone:
//!
//! `{bucket_prefix}/{year}/{PREFIX}-{CATEGORY}-{YYYYMMDD}-{NNN}.{ext}`
//!
//! so a key can always be recomputed from metadata and a catalog id can always
//! be recovered from a key. Keys must not contain `..` or a leading `/`.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

pub use archiva_core::StorageBackend;
pub use factory::create_storage;
pub use keys::{asset_key, parse_asset_key, validate_key};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{ObjectEntry, Storage, StorageError, StorageResult};
