//! OpenAPI documentation, served at `/api/openapi.json`.

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error;
use crate::handlers;
use archiva_core::models;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Archiva Ingestion API",
        version = "0.1.0",
        description = "Ingests media referenced by third-party URLs: deduplicates by content hash, assigns catalog ids, stores canonical objects and enriches them with translated text."
    ),
    paths(
        handlers::ingest::ingest,
        handlers::ingest::ingest_health,
        handlers::assets::get_asset,
        handlers::admin::preview_reconcile,
        handlers::admin::run_reconcile,
        handlers::admin::migrate_catalog_ids,
    ),
    components(
        schemas(
            models::IngestRequest,
            models::IngestResponse,
            models::IngestedAsset,
            models::AssetMetadata,
            models::MediaType,
            models::IngestionStage,
            models::CatalogRole,
            models::TranslationRecord,
            models::TranslationStatus,
            models::LocalizedText,
            handlers::ingest::IngestHealthResponse,
            archiva_worker::ReconcilePreview,
            archiva_worker::ReconcileCandidate,
            archiva_worker::ReconcileReport,
            archiva_worker::ReconcileSummary,
            archiva_worker::ReconcileItem,
            archiva_worker::ReconcileStatus,
            archiva_worker::MigrationReport,
            archiva_worker::MigrationChange,
            archiva_worker::MigrationFailure,
            error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "ingest", description = "Media ingestion"),
        (name = "assets", description = "Archived asset lookup"),
        (name = "admin", description = "Reconciliation and catalog id migration")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_lists_every_endpoint() {
        let spec = ApiDoc::openapi();
        for path in [
            "/api/ingest",
            "/api/assets/{id}",
            "/api/admin/reconcile",
            "/api/admin/migrate-catalog-ids",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {}", path);
        }
        let schemes = &spec.components.unwrap().security_schemes;
        assert!(schemes.contains_key("bearer"));
    }
}
