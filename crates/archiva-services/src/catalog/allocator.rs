use std::future::Future;
use std::sync::Arc;

use archiva_core::models::catalog_id::{COVER_SEQUENCE, FIRST_MEMBER_SEQUENCE, MAX_SEQUENCE};
use archiva_core::{AppError, CatalogId, CatalogIdError, CatalogRole};
use archiva_db::{AssetStore, PersistenceError};
use chrono::NaiveDate;

#[derive(Debug, thiserror::Error)]
pub enum AllocationError {
    /// The cover slot of a scope is single-use and is never retried.
    #[error("catalog id {0} is already taken")]
    Taken(String),

    #[error("no free catalog id in scope {scope} after {attempts} attempts")]
    Exhausted { scope: String, attempts: u32 },

    #[error("catalog scope {0} has no sequence left")]
    SequenceOverflow(String),

    #[error(transparent)]
    Invalid(#[from] CatalogIdError),

    #[error(transparent)]
    Store(#[from] PersistenceError),
}

impl From<AllocationError> for AppError {
    fn from(err: AllocationError) -> Self {
        match err {
            AllocationError::Taken(catalog_id) => AppError::AllocationConflict {
                scope: catalog_id,
                attempts: 1,
            },
            AllocationError::Exhausted { scope, attempts } => {
                AppError::AllocationConflict { scope, attempts }
            }
            AllocationError::SequenceOverflow(_) | AllocationError::Invalid(_) => {
                AppError::Validation(err.to_string())
            }
            AllocationError::Store(e) => e.into(),
        }
    }
}

/// Result of trying to make an allocated id durable.
#[derive(Debug)]
pub enum Claim<T> {
    Committed(T),
    /// Someone else holds the id; allocate again from a fresh read.
    Taken,
}

/// Hands out catalog ids scoped by `(category, date)`.
///
/// Allocation reads the highest sequence in the scope and proposes the next
/// one. Nothing is reserved: the id only becomes real when the caller's commit
/// succeeds against the unique constraint on `catalog_id`. A lost race is
/// reported by the commit as [`Claim::Taken`] and the allocator retries.
#[derive(Clone)]
pub struct CatalogAllocator {
    store: Arc<dyn AssetStore>,
    prefix: String,
    max_attempts: u32,
}

impl CatalogAllocator {
    pub fn new(store: Arc<dyn AssetStore>, prefix: impl Into<String>, max_attempts: u32) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Propose the next id for the scope without claiming it.
    pub async fn allocate(
        &self,
        category: &str,
        date: NaiveDate,
        role: CatalogRole,
    ) -> Result<CatalogId, AllocationError> {
        self.next_id(category, date, role, 0).await
    }

    /// Allocate an id and hand it to `commit` until one sticks.
    ///
    /// `commit` returns [`Claim::Taken`] when the id is already in use (unique
    /// violation, object already present). The next attempt never proposes a
    /// sequence at or below the one that was taken. A taken cover fails
    /// immediately.
    #[tracing::instrument(skip(self, commit), fields(catalog.prefix = %self.prefix))]
    pub async fn allocate_and_commit<T, F, Fut>(
        &self,
        category: &str,
        date: NaiveDate,
        role: CatalogRole,
        mut commit: F,
    ) -> Result<(CatalogId, T), AppError>
    where
        F: FnMut(CatalogId) -> Fut,
        Fut: Future<Output = Result<Claim<T>, AppError>>,
    {
        let scope = CatalogId::scope_key(&self.prefix, category, date);
        let mut floor = 0u16;

        for attempt in 1..=self.max_attempts {
            let id = self.next_id(category, date, role, floor).await?;

            match commit(id.clone()).await? {
                Claim::Committed(value) => {
                    tracing::debug!(catalog_id = %id, attempt, "Catalog id committed");
                    return Ok((id, value));
                }
                Claim::Taken if id.is_cover() => {
                    tracing::warn!(catalog_id = %id, "Cover slot already taken");
                    return Err(AllocationError::Taken(id.to_string()).into());
                }
                Claim::Taken => {
                    tracing::warn!(
                        catalog_id = %id,
                        attempt,
                        max_attempts = self.max_attempts,
                        "Catalog id taken by a concurrent ingest, retrying"
                    );
                    floor = id.sequence().saturating_add(1);
                }
            }
        }

        tracing::error!(scope = %scope, attempts = self.max_attempts, "Catalog id allocation exhausted");
        Err(AllocationError::Exhausted {
            scope,
            attempts: self.max_attempts,
        }
        .into())
    }

    async fn next_id(
        &self,
        category: &str,
        date: NaiveDate,
        role: CatalogRole,
        floor: u16,
    ) -> Result<CatalogId, AllocationError> {
        if role == CatalogRole::Cover {
            return Ok(CatalogId::new(
                self.prefix.as_str(),
                category,
                date,
                u32::from(COVER_SEQUENCE),
            )?);
        }

        let scope = CatalogId::scope_key(&self.prefix, category, date);
        let highest = self.store.max_sequence(&scope).await?;
        let next = highest
            .map_or(u32::from(FIRST_MEMBER_SEQUENCE), |max| u32::from(max) + 1)
            .max(u32::from(floor));

        if next > u32::from(MAX_SEQUENCE) {
            return Err(AllocationError::SequenceOverflow(scope));
        }
        Ok(CatalogId::new(self.prefix.as_str(), category, date, next)?)
    }
}
