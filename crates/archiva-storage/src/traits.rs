//! Storage abstraction trait
//!
//! Every backend (S3, local filesystem) implements [`Storage`], so the pipeline
//! never couples to a specific object store.

use crate::StorageBackend;
use archiva_core::AppError;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    /// A create-only write found an object already at the key.
    #[error("Object already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidKey(msg) => AppError::Validation(msg),
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// One object returned by [`Storage::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    pub key: String,
    pub size: u64,
    pub modified_at: DateTime<Utc>,
}

/// Storage abstraction trait
///
/// `put` overwrites, so repeating it with the same bytes is harmless.
/// `put_if_absent` is the claim used when a catalog id is written for the first
/// time: it must fail with [`StorageError::AlreadyExists`] instead of replacing
/// another asset's object.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write `data` at `key` and return its public URL.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<String>;

    /// Write `data` at `key` only if nothing is stored there yet.
    async fn put_if_absent(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StorageResult<String>;

    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Every object whose key starts with `prefix`, in no particular order.
    async fn list(&self, prefix: &str) -> StorageResult<Vec<ObjectEntry>>;

    /// Remove an object. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Public URL for `key`, without checking that it exists.
    fn public_url(&self, key: &str) -> String;

    fn backend_type(&self) -> StorageBackend;
}
