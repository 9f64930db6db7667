use archiva_core::AppError;
use uuid::Uuid;

pub const CONTENT_HASH_CONSTRAINT: &str = "assets_content_hash_key";
pub const CATALOG_ID_CONSTRAINT: &str = "assets_catalog_id_key";

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// Unique violation on `content_hash`: the bytes are already archived.
    #[error("content hash {0} is already archived")]
    DuplicateContentHash(String),

    /// Unique violation on `catalog_id`: a concurrent allocation won the id.
    #[error("catalog id {0} is already assigned")]
    DuplicateCatalogId(String),

    #[error("asset {0} not found")]
    NotFound(Uuid),

    #[error("stored asset record is invalid: {0}")]
    CorruptRecord(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

impl PersistenceError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            PersistenceError::DuplicateContentHash(_) | PersistenceError::DuplicateCatalogId(_)
        )
    }
}

/// Classify a failed insert or update of an asset row.
///
/// Unique violations are recognised by constraint name so that callers can tell a
/// duplicate upload from a lost allocation race.
pub fn classify_write_error(
    err: sqlx::Error,
    content_hash: &str,
    catalog_id: &str,
) -> PersistenceError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            match db_err.constraint() {
                Some(CONTENT_HASH_CONSTRAINT) => {
                    return PersistenceError::DuplicateContentHash(content_hash.to_string())
                }
                Some(CATALOG_ID_CONSTRAINT) => {
                    return PersistenceError::DuplicateCatalogId(catalog_id.to_string())
                }
                other => {
                    tracing::warn!(
                        constraint = ?other,
                        "Unique violation on unexpected constraint"
                    );
                }
            }
        }
    }
    PersistenceError::Database(err)
}

impl From<PersistenceError> for AppError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::Database(e) => AppError::Database(e),
            PersistenceError::NotFound(id) => AppError::NotFound(format!("Asset {} not found", id)),
            other => AppError::Persistence(other.to_string()),
        }
    }
}
