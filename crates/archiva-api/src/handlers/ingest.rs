//! Ingestion endpoint
//!
//! Always answers with the `IngestResponse` shape, failures included, so the
//! caller gets a definitive stage for every submission.

use std::sync::Arc;

use archiva_core::{AppError, ErrorMetadata, IngestRequest, IngestResponse};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{json_rejection_error, log_error, status_of, ErrorResponse};
use crate::services::IngestOutcome;
use crate::state::AppState;

const SERVICE_NAME: &str = "archiva-ingest";

#[derive(Debug, Serialize, ToSchema)]
pub struct IngestHealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: String,
}

#[utoipa::path(
    post,
    path = "/api/ingest",
    tag = "ingest",
    request_body = IngestRequest,
    responses(
        (status = 201, description = "Asset created", body = IngestResponse),
        (status = 200, description = "Content already archived", body = IngestResponse),
        (status = 400, description = "Invalid request", body = IngestResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 409, description = "Catalog id allocation kept conflicting", body = IngestResponse),
        (status = 413, description = "Media exceeds the size limit", body = IngestResponse),
        (status = 502, description = "Media could not be fetched", body = IngestResponse),
        (status = 504, description = "Media host timed out", body = IngestResponse)
    ),
    security(("bearer" = []))
)]
pub async fn ingest(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<IngestRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return failure(json_rejection_error(&rejection)),
    };

    match state.ingestion.ingest(request).await {
        Ok(IngestOutcome::Created(asset)) => (
            StatusCode::CREATED,
            Json(IngestResponse::created(
                asset.id,
                asset.catalog_id,
                asset.ingestion_stage,
            )),
        )
            .into_response(),
        Ok(IngestOutcome::Duplicate(existing)) => (
            StatusCode::OK,
            Json(IngestResponse::duplicate(
                Some(existing.id),
                Some(existing.catalog_id),
            )),
        )
            .into_response(),
        Err(e) => failure(e),
    }
}

fn failure(error: AppError) -> Response {
    if let AppError::DuplicateContent { existing_id } = error {
        return (
            StatusCode::OK,
            Json(IngestResponse::duplicate(Some(existing_id), None)),
        )
            .into_response();
    }
    log_error(&error);
    (
        status_of(&error),
        Json(IngestResponse::failed(error.client_message())),
    )
        .into_response()
}

#[utoipa::path(
    get,
    path = "/api/ingest",
    tag = "ingest",
    responses((status = 200, description = "Ingestion service is up", body = IngestHealthResponse))
)]
pub async fn ingest_health() -> Json<IngestHealthResponse> {
    Json(IngestHealthResponse {
        status: "ok".to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}
