//! Route configuration and setup

use std::sync::Arc;

use archiva_core::Config;
use archiva_infra::request_id_middleware;
use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::api_doc::ApiDoc;
use crate::auth::auth_middleware;
use crate::handlers;
use crate::state::AppState;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config);

    let protected_routes = protected_routes().layer(axum::middleware::from_fn_with_state(
        state.auth.clone(),
        auth_middleware,
    ));

    let concurrency_limit = config.max_concurrent_requests().max(1);
    tracing::info!(
        concurrency_limit,
        body_limit_bytes = config.request_body_limit_bytes(),
        "HTTP limits enabled"
    );

    let app = public_routes()
        .merge(ingest_routes(&state))
        .merge(protected_routes)
        .layer(ConcurrencyLimitLayer::new(concurrency_limit))
        .layer(RequestBodyLimitLayer::new(config.request_body_limit_bytes()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state);

    Ok(app)
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];
    if config.cors_origins().iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins()
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(origin) => Some(origin),
                Err(_) => {
                    tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    }
}

/// Public routes (no authentication required)
fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/live", get(handlers::health::liveness_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/api/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
}

/// Routes behind the bearer token
fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/assets/{id}", get(handlers::assets::get_asset))
        .route(
            "/api/admin/reconcile",
            get(handlers::admin::preview_reconcile).post(handlers::admin::run_reconcile),
        )
        .route(
            "/api/admin/migrate-catalog-ids",
            post(handlers::admin::migrate_catalog_ids),
        )
}

/// `POST /api/ingest` needs a token; `GET /api/ingest` is a public probe.
fn ingest_routes(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new().route(
        "/api/ingest",
        get(handlers::ingest::ingest_health).merge(post(handlers::ingest::ingest).route_layer(
            axum::middleware::from_fn_with_state(state.auth.clone(), auth_middleware),
        )),
    )
}
