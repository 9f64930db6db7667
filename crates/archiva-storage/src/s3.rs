use crate::keys::validate_key;
use crate::traits::{ObjectEntry, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, Attributes, ObjectStore, ObjectStoreExt, PutMode, PutOptions, PutPayload,
};

/// S3 storage implementation (AWS S3, Cloudflare R2, MinIO)
#[derive(Clone)]
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
    region: String,
    endpoint_url: Option<String>,
    public_base_url: Option<String>,
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `bucket` - bucket name
    /// * `region` - AWS region (`auto` for R2)
    /// * `endpoint_url` - custom endpoint for S3-compatible providers
    /// * `public_base_url` - CDN or public bucket domain used for returned URLs
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
        public_base_url: Option<String>,
    ) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region.clone())
            .with_bucket_name(bucket.clone());

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3Storage {
            store,
            bucket,
            region,
            endpoint_url,
            public_base_url,
        })
    }

    fn put_options(content_type: &str, mode: PutMode) -> PutOptions {
        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
        PutOptions {
            mode,
            attributes,
            ..Default::default()
        }
    }

    async fn put_with_mode(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
        mode: PutMode,
    ) -> StorageResult<String> {
        validate_key(key)?;
        let size = data.len();
        let location = Path::from(key);
        let start = std::time::Instant::now();

        let result = self
            .store
            .put_opts(
                &location,
                PutPayload::from(data),
                Self::put_options(content_type, mode),
            )
            .await;

        match result {
            Ok(_) => {
                tracing::info!(
                    bucket = %self.bucket,
                    key = %key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 upload successful"
                );
                Ok(self.public_url(key))
            }
            Err(ObjectStoreError::AlreadyExists { .. }) => {
                tracing::debug!(bucket = %self.bucket, key = %key, "S3 object already exists");
                Err(StorageError::AlreadyExists(key.to_string()))
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 upload failed"
                );
                Err(StorageError::UploadFailed(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl Storage for S3Storage {
    #[tracing::instrument(skip(self, data), fields(aws.service.name = "s3", aws.s3.operation = "PutObject"))]
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<String> {
        self.put_with_mode(key, data, content_type, PutMode::Overwrite)
            .await
    }

    #[tracing::instrument(skip(self, data), fields(aws.service.name = "s3", aws.s3.operation = "PutObject"))]
    async fn put_if_absent(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StorageResult<String> {
        self.put_with_mode(key, data, content_type, PutMode::Create)
            .await
    }

    #[tracing::instrument(skip(self), fields(aws.service.name = "s3", aws.s3.operation = "GetObject"))]
    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        validate_key(key)?;
        let location = Path::from(key);

        let response = match self.store.get(&location).await {
            Ok(response) => response,
            Err(ObjectStoreError::NotFound { .. }) => {
                return Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => return Err(StorageError::DownloadFailed(e.to_string())),
        };

        response
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        validate_key(key)?;
        match self.store.head(&Path::from(key)).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    #[tracing::instrument(skip(self), fields(aws.service.name = "s3", aws.s3.operation = "ListObjectsV2"))]
    async fn list(&self, prefix: &str) -> StorageResult<Vec<ObjectEntry>> {
        let raw_prefix = prefix.trim_start_matches('/');
        // object_store lists whole path segments; the tail is filtered below.
        let dir_prefix = raw_prefix.rsplit_once('/').map(|(dir, _)| dir);
        let location = dir_prefix.map(Path::from);

        let objects: Vec<_> = ObjectStore::list(&self.store, location.as_ref())
            .try_collect()
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?;

        let entries: Vec<ObjectEntry> = objects
            .into_iter()
            .map(|meta| ObjectEntry {
                key: meta.location.to_string(),
                size: meta.size,
                modified_at: meta.last_modified,
            })
            .filter(|entry| entry.key.starts_with(raw_prefix))
            .collect();

        tracing::debug!(bucket = %self.bucket, prefix = %raw_prefix, count = entries.len(), "S3 list");
        Ok(entries)
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        match self.store.delete(&Path::from(key)).await {
            Ok(()) | Err(ObjectStoreError::NotFound { .. }) => Ok(()),
            Err(e) => {
                tracing::error!(error = %e, bucket = %self.bucket, key = %key, "S3 delete failed");
                Err(StorageError::DeleteFailed(e.to_string()))
            }
        }
    }

    /// Public URL for an object
    ///
    /// A configured public base (CDN, R2 public domain) wins; otherwise the
    /// path-style endpoint URL or the standard AWS virtual-hosted URL is used.
    fn public_url(&self, key: &str) -> String {
        if let Some(ref base) = self.public_base_url {
            format!("{}/{}", base.trim_end_matches('/'), key)
        } else if let Some(ref endpoint) = self.endpoint_url {
            format!("{}/{}/{}", endpoint.trim_end_matches('/'), self.bucket, key)
        } else {
            format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, key
            )
        }
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn storage(endpoint: Option<&str>, public: Option<&str>) -> S3Storage {
        S3Storage::new(
            "archive".to_string(),
            "auto".to_string(),
            endpoint.map(String::from),
            public.map(String::from),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_public_url_prefers_public_base() {
        let s3 = storage(
            Some("https://account.r2.cloudflarestorage.com"),
            Some("https://cdn.example.com/"),
        )
        .await;
        assert_eq!(
            s3.public_url("magazines/2024/a.webp"),
            "https://cdn.example.com/magazines/2024/a.webp"
        );
    }

    #[tokio::test]
    async fn test_public_url_path_style_for_custom_endpoint() {
        let s3 = storage(Some("http://localhost:9000/"), None).await;
        assert_eq!(
            s3.public_url("magazines/2024/a.webp"),
            "http://localhost:9000/archive/magazines/2024/a.webp"
        );
    }

    #[tokio::test]
    async fn test_public_url_aws_default() {
        let s3 = storage(None, None).await;
        assert_eq!(
            s3.public_url("k.webp"),
            "https://archive.s3.auto.amazonaws.com/k.webp"
        );
    }
}
