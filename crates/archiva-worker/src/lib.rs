//! Archiva Worker
//!
//! Work that runs outside the ingestion request: translation enrichment of
//! freshly persisted assets, the reconciliation sweep that backfills records
//! for orphaned objects, and the one-off migration of legacy catalog ids.

pub mod enrichment;
pub mod migration;
pub mod reconcile;

#[cfg(test)]
pub(crate) mod test_support;

pub use enrichment::{EnrichmentJob, EnrichmentWorker, TRANSLATION_NOT_CONFIGURED};
pub use migration::{CatalogMigration, MigrationChange, MigrationFailure, MigrationReport};
pub use reconcile::{
    ReconcileCandidate, ReconcileItem, ReconcilePreview, ReconcileReport, ReconcileStatus,
    ReconcileSummary, ReconcileSweep, RECONCILED_NOTE,
};
