use std::time::Duration;

use archiva_core::AppError;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid media url: {0}")]
    InvalidUrl(String),

    #[error("media url not allowed: {0}")]
    Blocked(String),

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("upstream responded with HTTP {0}")]
    Status(u16),

    #[error("payload exceeds {limit} bytes (got {actual})")]
    TooLarge { limit: u64, actual: u64 },

    #[error("network error: {0}")]
    Network(String),
}

impl From<FetchError> for AppError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::InvalidUrl(_) | FetchError::Blocked(_) => {
                AppError::Validation(err.to_string())
            }
            FetchError::Timeout(_) => AppError::FetchTimeout(err.to_string()),
            FetchError::TooLarge { .. } => AppError::PayloadTooLarge(err.to_string()),
            FetchError::Status(_) | FetchError::Network(_) => AppError::Fetch(err.to_string()),
        }
    }
}
