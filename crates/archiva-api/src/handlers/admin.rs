//! Maintenance endpoints: reconciliation sweep and legacy id migration.

use std::sync::Arc;

use archiva_worker::{MigrationReport, ReconcilePreview, ReconcileReport};
use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct MigrateQuery {
    /// Report the planned changes without writing. Defaults to `true`.
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,
}

fn default_dry_run() -> bool {
    true
}

#[utoipa::path(
    get,
    path = "/api/admin/reconcile",
    tag = "admin",
    responses(
        (status = 200, description = "Objects that would be backfilled", body = ReconcilePreview),
        (status = 500, description = "Storage or database failure", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn preview_reconcile(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReconcilePreview>, HttpAppError> {
    Ok(Json(state.reconcile.preview().await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/reconcile",
    tag = "admin",
    responses(
        (status = 200, description = "Per-object backfill results", body = ReconcileReport),
        (status = 500, description = "Storage or database failure", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn run_reconcile(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReconcileReport>, HttpAppError> {
    Ok(Json(state.reconcile.run().await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/migrate-catalog-ids",
    tag = "admin",
    params(MigrateQuery),
    responses(
        (status = 200, description = "Migration report", body = MigrationReport),
        (status = 500, description = "Storage or database failure", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn migrate_catalog_ids(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MigrateQuery>,
) -> Result<Json<MigrationReport>, HttpAppError> {
    Ok(Json(state.migration.run(query.dry_run).await?))
}
