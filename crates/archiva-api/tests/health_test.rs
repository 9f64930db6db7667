//! Probe and documentation endpoints.

mod helpers;

use helpers::setup_test_app;
use serde_json::Value;

#[tokio::test]
async fn test_liveness() {
    let app = setup_test_app().await;

    let response = app.client().get("/live").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "alive");
}

#[tokio::test]
async fn test_readiness_checks_store() {
    let app = setup_test_app().await;

    let response = app.client().get("/ready").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ready");
    assert_eq!(body["database"], "healthy");
}

#[tokio::test]
async fn test_health_reports_dependencies() {
    let app = setup_test_app().await;

    let response = app.client().get("/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "healthy");
    assert_eq!(body["storage"], "healthy");
    assert_eq!(body["translation"], "not_configured");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = setup_test_app().await;

    let response = app.client().get("/api/openapi.json").await;

    response.assert_status_ok();
    let doc: Value = response.json();
    assert!(doc["paths"]["/api/ingest"].is_object());
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = setup_test_app().await;

    let generated = app.client().get("/live").await;
    assert!(!generated.header("x-request-id").is_empty());

    let echoed = app
        .client()
        .get("/live")
        .add_header("x-request-id", "trace-abc")
        .await;
    assert_eq!(echoed.header("x-request-id"), "trace-abc");
}
