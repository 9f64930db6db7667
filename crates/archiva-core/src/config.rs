//! Configuration module
//!
//! Everything is read from the process environment (after loading `.env`).
//! `Config` is a cheap handle around the boxed settings so it can be cloned into
//! every service and handler.

use std::env;

use crate::storage_types::StorageBackend;

const PORT: u16 = 3000;
const MAX_CONNECTIONS: u32 = 10;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const MAX_CONCURRENT_REQUESTS: usize = 64;
const REQUEST_BODY_LIMIT_BYTES: usize = 1024 * 1024;

const CATALOG_PREFIX: &str = "LMSY";
const BUCKET_PREFIX: &str = "magazines";
const FETCH_TIMEOUT_SECS: u64 = 60;
const FETCH_MAX_BYTES: u64 = 50 * 1024 * 1024;
const IMAGE_QUALITY: u8 = 95;
const TRANSCODE_CONCURRENCY: usize = 4;
const ALLOCATION_MAX_ATTEMPTS: u32 = 5;
const TRANSLATION_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const TRANSLATION_MODEL: &str = "anthropic/claude-3.5-sonnet";
const TRANSLATION_TIMEOUT_SECS: u64 = 120;

/// Server-level settings shared by every binary.
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub environment: String,
    pub log_format: String,
    pub max_concurrent_requests: usize,
    pub request_body_limit_bytes: usize,
}

impl Default for BaseConfig {
    fn default() -> Self {
        Self {
            server_port: PORT,
            cors_origins: vec!["*".to_string()],
            db_max_connections: MAX_CONNECTIONS,
            db_timeout_seconds: CONNECTION_TIMEOUT_SECS,
            environment: "development".to_string(),
            log_format: "text".to_string(),
            max_concurrent_requests: MAX_CONCURRENT_REQUESTS,
            request_body_limit_bytes: REQUEST_BODY_LIMIT_BYTES,
        }
    }
}

/// Ingestion service configuration
#[derive(Clone, Debug)]
pub struct IngestConfig {
    pub base: BaseConfig,
    pub database_url: String,
    // Storage configuration
    pub storage_backend: Option<StorageBackend>,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // R2, MinIO and other S3-compatible providers
    pub s3_public_url: Option<String>,
    pub aws_region: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    // Ingestion endpoint
    pub ingest_api_tokens: Vec<String>,
    pub catalog_prefix: String,
    pub bucket_prefix: String,
    pub allocation_max_attempts: u32,
    // Media fetcher
    pub fetch_timeout_seconds: u64,
    pub fetch_max_bytes: u64,
    pub fetch_allow_private_hosts: bool,
    // Transcoder
    pub image_quality: u8,
    pub ffprobe_path: String,
    pub transcode_concurrency: usize,
    // Translation enrichment
    pub translation_api_key: Option<String>,
    pub translation_api_url: String,
    pub translation_model: String,
    pub translation_timeout_seconds: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            base: BaseConfig::default(),
            database_url: String::new(),
            storage_backend: None,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            s3_public_url: None,
            aws_region: None,
            local_storage_path: None,
            local_storage_base_url: None,
            ingest_api_tokens: Vec::new(),
            catalog_prefix: CATALOG_PREFIX.to_string(),
            bucket_prefix: BUCKET_PREFIX.to_string(),
            allocation_max_attempts: ALLOCATION_MAX_ATTEMPTS,
            fetch_timeout_seconds: FETCH_TIMEOUT_SECS,
            fetch_max_bytes: FETCH_MAX_BYTES,
            fetch_allow_private_hosts: false,
            image_quality: IMAGE_QUALITY,
            ffprobe_path: "ffprobe".to_string(),
            transcode_concurrency: TRANSCODE_CONCURRENCY,
            translation_api_key: None,
            translation_api_url: TRANSLATION_API_URL.to_string(),
            translation_model: TRANSLATION_MODEL.to_string(),
            translation_timeout_seconds: TRANSLATION_TIMEOUT_SECS,
        }
    }
}

/// Shared configuration handle
#[derive(Clone, Debug)]
pub struct Config(pub Box<IngestConfig>);

impl From<IngestConfig> for Config {
    fn from(config: IngestConfig) -> Self {
        Config(Box::new(config))
    }
}

impl Config {
    pub fn as_ingest(&self) -> &IngestConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = IngestConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_ingest().validate()
    }

    pub fn server_port(&self) -> u16 {
        self.as_ingest().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.as_ingest().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.as_ingest().base.environment
    }

    pub fn is_production(&self) -> bool {
        let env = self.environment().to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn log_format(&self) -> &str {
        &self.as_ingest().base.log_format
    }

    pub fn max_concurrent_requests(&self) -> usize {
        self.as_ingest().base.max_concurrent_requests
    }

    pub fn request_body_limit_bytes(&self) -> usize {
        self.as_ingest().base.request_body_limit_bytes
    }

    pub fn database_url(&self) -> &str {
        &self.as_ingest().database_url
    }

    pub fn db_max_connections(&self) -> u32 {
        self.as_ingest().base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.as_ingest().base.db_timeout_seconds
    }

    pub fn storage_backend(&self) -> Option<StorageBackend> {
        self.as_ingest().storage_backend
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.as_ingest().s3_bucket.as_deref()
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.as_ingest().s3_region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.as_ingest().s3_endpoint.as_deref()
    }

    pub fn s3_public_url(&self) -> Option<&str> {
        self.as_ingest().s3_public_url.as_deref()
    }

    pub fn aws_region(&self) -> Option<&str> {
        self.as_ingest().aws_region.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.as_ingest().local_storage_path.as_deref()
    }

    pub fn local_storage_base_url(&self) -> Option<&str> {
        self.as_ingest().local_storage_base_url.as_deref()
    }

    pub fn ingest_api_tokens(&self) -> &[String] {
        &self.as_ingest().ingest_api_tokens
    }

    pub fn catalog_prefix(&self) -> &str {
        &self.as_ingest().catalog_prefix
    }

    pub fn bucket_prefix(&self) -> &str {
        &self.as_ingest().bucket_prefix
    }

    pub fn allocation_max_attempts(&self) -> u32 {
        self.as_ingest().allocation_max_attempts
    }

    pub fn fetch_timeout_seconds(&self) -> u64 {
        self.as_ingest().fetch_timeout_seconds
    }

    pub fn fetch_max_bytes(&self) -> u64 {
        self.as_ingest().fetch_max_bytes
    }

    pub fn fetch_allow_private_hosts(&self) -> bool {
        self.as_ingest().fetch_allow_private_hosts
    }

    pub fn image_quality(&self) -> u8 {
        self.as_ingest().image_quality
    }

    pub fn ffprobe_path(&self) -> &str {
        &self.as_ingest().ffprobe_path
    }

    pub fn transcode_concurrency(&self) -> usize {
        self.as_ingest().transcode_concurrency
    }

    pub fn translation_api_key(&self) -> Option<&str> {
        self.as_ingest().translation_api_key.as_deref()
    }

    pub fn translation_api_url(&self) -> &str {
        &self.as_ingest().translation_api_url
    }

    pub fn translation_model(&self) -> &str {
        &self.as_ingest().translation_model
    }

    pub fn translation_timeout_seconds(&self) -> u64 {
        self.as_ingest().translation_timeout_seconds
    }
}

fn comma_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn parse_bool(key: &str) -> bool {
    env::var(key)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

impl IngestConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let server_port = match env::var("PORT") {
            Ok(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            Err(_) => PORT,
        };

        let base = BaseConfig {
            server_port,
            cors_origins: comma_list(&env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string())),
            db_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", MAX_CONNECTIONS),
            db_timeout_seconds: parse_or("DATABASE_TIMEOUT_SECONDS", CONNECTION_TIMEOUT_SECS),
            environment,
            log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string()),
            max_concurrent_requests: parse_or("MAX_CONCURRENT_REQUESTS", MAX_CONCURRENT_REQUESTS),
            request_body_limit_bytes: parse_or(
                "REQUEST_BODY_LIMIT_BYTES",
                REQUEST_BODY_LIMIT_BYTES,
            ),
        };

        let database_url =
            env::var("DATABASE_URL").map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(raw) => Some(raw.parse::<StorageBackend>()?),
            Err(_) => None,
        };

        Ok(IngestConfig {
            base,
            database_url,
            storage_backend,
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION").ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            s3_public_url: env::var("S3_PUBLIC_URL").ok(),
            aws_region: env::var("AWS_REGION").ok(),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL").ok(),
            ingest_api_tokens: comma_list(&env::var("INGEST_API_TOKENS").unwrap_or_default()),
            catalog_prefix: env::var("CATALOG_PREFIX")
                .map(|p| p.trim().to_uppercase())
                .unwrap_or_else(|_| CATALOG_PREFIX.to_string()),
            bucket_prefix: env::var("BUCKET_PREFIX")
                .map(|p| p.trim().trim_matches('/').to_string())
                .unwrap_or_else(|_| BUCKET_PREFIX.to_string()),
            allocation_max_attempts: parse_or("ALLOCATION_MAX_ATTEMPTS", ALLOCATION_MAX_ATTEMPTS),
            fetch_timeout_seconds: parse_or("FETCH_TIMEOUT_SECONDS", FETCH_TIMEOUT_SECS),
            fetch_max_bytes: parse_or("FETCH_MAX_BYTES", FETCH_MAX_BYTES),
            fetch_allow_private_hosts: parse_bool("FETCH_ALLOW_PRIVATE_HOSTS"),
            image_quality: parse_or("IMAGE_QUALITY", IMAGE_QUALITY),
            ffprobe_path: env::var("FFPROBE_PATH").unwrap_or_else(|_| "ffprobe".to_string()),
            transcode_concurrency: parse_or("TRANSCODE_CONCURRENCY", TRANSCODE_CONCURRENCY),
            translation_api_key: env::var("TRANSLATION_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            translation_api_url: env::var("TRANSLATION_API_URL")
                .unwrap_or_else(|_| TRANSLATION_API_URL.to_string()),
            translation_model: env::var("TRANSLATION_MODEL")
                .unwrap_or_else(|_| TRANSLATION_MODEL.to_string()),
            translation_timeout_seconds: parse_or(
                "TRANSLATION_TIMEOUT_SECONDS",
                TRANSLATION_TIMEOUT_SECS,
            ),
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !(self.database_url.starts_with("postgresql://")
            || self.database_url.starts_with("postgres://"))
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.ingest_api_tokens.is_empty() {
            return Err(anyhow::anyhow!(
                "INGEST_API_TOKENS must contain at least one token"
            ));
        }

        if self.catalog_prefix.is_empty()
            || !self.catalog_prefix.chars().all(|c| c.is_ascii_uppercase())
        {
            return Err(anyhow::anyhow!(
                "CATALOG_PREFIX must consist of uppercase letters only"
            ));
        }

        if self.bucket_prefix.is_empty() || self.bucket_prefix.contains("..") {
            return Err(anyhow::anyhow!("BUCKET_PREFIX must be a non-empty relative path"));
        }

        if !(1..=100).contains(&self.image_quality) {
            return Err(anyhow::anyhow!("IMAGE_QUALITY must be between 1 and 100"));
        }

        if self.transcode_concurrency == 0 {
            return Err(anyhow::anyhow!("TRANSCODE_CONCURRENCY must be at least 1"));
        }

        if self.allocation_max_attempts == 0 {
            return Err(anyhow::anyhow!("ALLOCATION_MAX_ATTEMPTS must be at least 1"));
        }

        if self.base.environment.eq_ignore_ascii_case("production")
            && self.base.cors_origins.iter().any(|o| o == "*")
        {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        match self.storage_backend.unwrap_or(StorageBackend::S3) {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!("S3_BUCKET is required for the s3 backend"));
                }
                if self.s3_region.is_none() && self.aws_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION is required for the s3 backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() || self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH and LOCAL_STORAGE_BASE_URL are required for the local backend"
                    ));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_local_config() -> IngestConfig {
        IngestConfig {
            database_url: "postgres://localhost/archiva".to_string(),
            storage_backend: Some(StorageBackend::Local),
            local_storage_path: Some("/tmp/archiva".to_string()),
            local_storage_base_url: Some("http://localhost:3000/media".to_string()),
            ingest_api_tokens: vec!["token".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid_local_config().validate().is_ok());
    }

    #[test]
    fn test_defaults_follow_documented_values() {
        let config = Config::from(valid_local_config());
        assert_eq!(config.catalog_prefix(), "LMSY");
        assert_eq!(config.bucket_prefix(), "magazines");
        assert_eq!(config.fetch_max_bytes(), 50 * 1024 * 1024);
        assert_eq!(config.image_quality(), 95);
        assert_eq!(config.allocation_max_attempts(), 5);
        assert!(!config.is_production());
    }

    #[test]
    fn test_rejects_missing_tokens() {
        let mut config = valid_local_config();
        config.ingest_api_tokens.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_lowercase_prefix() {
        let mut config = valid_local_config();
        config.catalog_prefix = "lmsy".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_quality_out_of_range() {
        let mut config = valid_local_config();
        config.image_quality = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_s3_backend_requires_bucket_and_region() {
        let mut config = valid_local_config();
        config.storage_backend = Some(StorageBackend::S3);
        assert!(config.validate().is_err());

        config.s3_bucket = Some("archive".to_string());
        assert!(config.validate().is_err());

        config.aws_region = Some("auto".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_comma_list_drops_blanks() {
        assert_eq!(comma_list(" a, ,b ,"), vec!["a".to_string(), "b".to_string()]);
    }
}
