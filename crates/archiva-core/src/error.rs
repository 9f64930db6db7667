//! Error types module
//!
//! `AppError` is the user-facing error taxonomy of the ingestion pipeline.
//! Library crates keep their own narrow error enums and convert into this one at
//! the orchestration boundary.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx` feature.

use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;
use uuid::Uuid;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like upstream failures
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "FETCH_TIMEOUT")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Bad input, rejected before any side effect.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Fetch timed out: {0}")]
    FetchTimeout(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Unsupported media: {0}")]
    UnsupportedMedia(String),

    /// Not a failure for callers: the content is already archived.
    #[error("Duplicate content: already archived as {existing_id}")]
    DuplicateContent { existing_id: Uuid },

    #[error("Catalog id allocation for {scope} still conflicting after {attempts} attempts")]
    AllocationConflict { scope: String, attempts: u32 },

    #[error("Storage error: {0}")]
    Storage(String),

    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Translation error: {0}")]
    Translation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(format!("JSON parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(format!("Validation error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::Validation(_) => (
            400,
            "VALIDATION_ERROR",
            false,
            Some("Fix the request and submit it again"),
            false,
            LogLevel::Debug,
        ),
        AppError::Fetch(_) => (
            502,
            "FETCH_FAILED",
            true,
            Some("Check that the media URL is reachable and retry"),
            false,
            LogLevel::Warn,
        ),
        AppError::FetchTimeout(_) => (
            504,
            "FETCH_TIMEOUT",
            true,
            Some("Retry later; the media host did not answer in time"),
            false,
            LogLevel::Warn,
        ),
        AppError::PayloadTooLarge(_) => (
            413,
            "PAYLOAD_TOO_LARGE",
            false,
            Some("Submit a smaller media file"),
            false,
            LogLevel::Warn,
        ),
        AppError::UnsupportedMedia(_) => (
            415,
            "UNSUPPORTED_MEDIA",
            false,
            Some("Only image and video media can be ingested"),
            false,
            LogLevel::Warn,
        ),
        AppError::DuplicateContent { .. } => {
            (200, "DUPLICATE_CONTENT", false, None, false, LogLevel::Debug)
        }
        AppError::AllocationConflict { .. } => (
            409,
            "ALLOCATION_CONFLICT",
            true,
            Some("Retry the request"),
            false,
            LogLevel::Error,
        ),
        AppError::Storage(_) => (
            500,
            "STORAGE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        #[cfg(feature = "sqlx")]
        AppError::Database(_) => (
            500,
            "DATABASE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Persistence(_) => (
            500,
            "PERSISTENCE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Translation(_) => (
            502,
            "TRANSLATION_ERROR",
            true,
            None,
            false,
            LogLevel::Warn,
        ),
        AppError::NotFound(_) => (404, "NOT_FOUND", false, None, false, LogLevel::Debug),
        AppError::Unauthorized(_) => (
            401,
            "UNAUTHORIZED",
            false,
            Some("Provide a valid bearer token"),
            false,
            LogLevel::Debug,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Contact support if this error persists"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Taxonomy name reported to clients
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Validation(_) => "ValidationError",
            AppError::Fetch(_) | AppError::FetchTimeout(_) | AppError::PayloadTooLarge(_) => {
                "FetchError"
            }
            AppError::UnsupportedMedia(_) => "UnsupportedMedia",
            AppError::DuplicateContent { .. } => "DuplicateContent",
            AppError::AllocationConflict { .. } => "AllocationConflict",
            AppError::Storage(_) => "StorageError",
            #[cfg(feature = "sqlx")]
            AppError::Database(_) => "PersistenceError",
            AppError::Persistence(_) => "PersistenceError",
            AppError::Translation(_) => "TranslationError",
            AppError::NotFound(_) => "NotFound",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::Internal(_) | AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Validation(ref msg) => msg.clone(),
            AppError::Fetch(ref msg) => format!("Failed to fetch media: {}", msg),
            AppError::FetchTimeout(ref msg) => format!("Timed out fetching media: {}", msg),
            AppError::PayloadTooLarge(ref msg) => msg.clone(),
            AppError::UnsupportedMedia(ref msg) => msg.clone(),
            AppError::DuplicateContent { existing_id } => {
                format!("Content already archived as {}", existing_id)
            }
            AppError::AllocationConflict { scope, attempts } => format!(
                "Could not allocate a catalog id for {} after {} attempts",
                scope, attempts
            ),
            AppError::Storage(_) => "Failed to access storage".to_string(),
            #[cfg(feature = "sqlx")]
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::Persistence(_) => "Failed to save asset metadata".to_string(),
            AppError::Translation(ref msg) => msg.clone(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::Unauthorized(ref msg) => msg.clone(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_validation() {
        let err = AppError::Validation("eventDate must be YYYY-MM-DD".to_string());
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert!(!err.is_recoverable());
        assert_eq!(err.client_message(), "eventDate must be YYYY-MM-DD");
        assert!(!err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Debug);
        assert_eq!(err.error_type(), "ValidationError");
    }

    #[cfg(feature = "sqlx")]
    #[test]
    fn test_error_metadata_database() {
        let err = AppError::from(sqlx::Error::PoolClosed);
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.error_code(), "DATABASE_ERROR");
        assert!(err.is_recoverable());
        assert_eq!(err.client_message(), "Failed to access database");
        assert!(err.is_sensitive());
        assert_eq!(err.error_type(), "PersistenceError");
    }

    #[test]
    fn test_fetch_family_shares_error_type() {
        let failures = [
            AppError::Fetch("HTTP 404".to_string()),
            AppError::FetchTimeout("after 60s".to_string()),
            AppError::PayloadTooLarge("60000000 bytes exceeds 52428800".to_string()),
        ];
        let statuses: Vec<u16> = failures.iter().map(|e| e.http_status_code()).collect();
        assert_eq!(statuses, vec![502, 504, 413]);
        assert!(failures.iter().all(|e| e.error_type() == "FetchError"));
    }

    #[test]
    fn test_allocation_conflict_is_recoverable() {
        let err = AppError::AllocationConflict {
            scope: "MAG/20241023".to_string(),
            attempts: 5,
        };
        assert_eq!(err.http_status_code(), 409);
        assert!(err.is_recoverable());
        assert!(err.client_message().contains("5 attempts"));
    }

    #[test]
    fn test_sensitive_errors_hide_details() {
        let err = AppError::Storage("bucket credentials rejected".to_string());
        assert!(err.is_sensitive());
        assert_eq!(err.client_message(), "Failed to access storage");
    }

    #[test]
    fn test_detailed_message_includes_source_chain() {
        let source = anyhow::anyhow!("connection reset").context("upload interrupted");
        let err = AppError::from(source);
        let details = err.detailed_message();
        assert!(details.starts_with("Internal error with source"));
        assert!(details.contains("Caused by: upload interrupted"));
    }
}
