use std::sync::Arc;

use archiva_core::{AppError, IngestedAsset};
use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/assets/{id}",
    tag = "assets",
    params(("id" = Uuid, Path, description = "Asset ID")),
    responses(
        (status = 200, description = "Asset found", body = IngestedAsset),
        (status = 404, description = "Asset not found", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn get_asset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<IngestedAsset>, HttpAppError> {
    let asset = state
        .store
        .find_by_id(id)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| AppError::NotFound(format!("Asset {} not found", id)))?;
    Ok(Json(asset))
}
