//! Reconciliation and catalog id migration endpoints.

mod helpers;

use archiva_core::{IngestionStage, TranslationStatus};
use archiva_db::AssetStore;
use archiva_storage::Storage;
use archiva_worker::RECONCILED_NOTE;
use chrono::NaiveDate;
use helpers::fixtures::{jpeg, new_asset};
use helpers::{setup_test_app, TEST_TOKEN};
use serde_json::Value;

const ORPHAN_KEY: &str = "magazines/2024/LMSY-MAG-20240105-003.webp";
const STRAY_KEY: &str = "magazines/2024/cover-final.webp";

#[tokio::test]
async fn test_reconcile_preview_and_run() {
    let app = setup_test_app().await;
    app.storage
        .put(ORPHAN_KEY, jpeg(1).into(), "image/webp")
        .await
        .unwrap();
    app.storage
        .put(STRAY_KEY, jpeg(2).into(), "image/webp")
        .await
        .unwrap();

    let preview = app
        .client()
        .get("/api/admin/reconcile")
        .authorization_bearer(TEST_TOKEN)
        .await;
    preview.assert_status_ok();
    let preview: Value = preview.json();
    assert_eq!(preview["toCreate"].as_array().unwrap().len(), 1);
    assert_eq!(preview["toCreate"][0]["key"], ORPHAN_KEY);
    assert_eq!(preview["toCreate"][0]["catalogId"], "LMSY-MAG-20240105-003");
    assert_eq!(preview["invalid"][0], STRAY_KEY);
    assert_eq!(app.store.count().await.unwrap(), 0);

    let run = app
        .client()
        .post("/api/admin/reconcile")
        .authorization_bearer(TEST_TOKEN)
        .await;
    run.assert_status_ok();
    let run: Value = run.json();
    assert_eq!(run["summary"]["created"], 1);
    assert_eq!(run["summary"]["errored"], 0);

    let asset = app
        .store
        .find_by_catalog_id("LMSY-MAG-20240105-003")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(asset.notes.as_deref(), Some(RECONCILED_NOTE));
    assert_eq!(asset.ingestion_stage, IngestionStage::Ready);
    assert_eq!(asset.translation_status, TranslationStatus::Skipped);
    assert_eq!(asset.event_date, NaiveDate::from_ymd_opt(2024, 1, 5));
    assert_eq!(asset.storage_path, ORPHAN_KEY);

    // A second sweep finds nothing to do.
    let again: Value = app
        .client()
        .post("/api/admin/reconcile")
        .authorization_bearer(TEST_TOKEN)
        .await
        .json();
    assert_eq!(again["summary"]["created"], 0);
    assert_eq!(again["summary"]["exists"], 1);
    assert_eq!(app.store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_migration_defaults_to_dry_run() {
    let app = setup_test_app().await;
    let legacy_key = "magazines/2023/LMSY-ED-2023-004.webp";
    app.storage
        .put(legacy_key, jpeg(3).into(), "image/webp")
        .await
        .unwrap();
    let mut legacy = new_asset("LMSY-ED-2023-004", "legacy-hash", legacy_key);
    legacy.event_date = NaiveDate::from_ymd_opt(2023, 3, 9);
    let id = app.store.insert(&legacy).await.unwrap().id;

    let dry = app
        .client()
        .post("/api/admin/migrate-catalog-ids")
        .authorization_bearer(TEST_TOKEN)
        .await;
    dry.assert_status_ok();
    let dry: Value = dry.json();
    assert_eq!(dry["dryRun"], true);
    assert_eq!(dry["totalRecords"], 1);
    assert_eq!(dry["legacyIds"], 1);
    assert_eq!(dry["changes"][0]["to"], "LMSY-MAG-20230309-004");
    let untouched = app.store.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(untouched.catalog_id, "LMSY-ED-2023-004");

    let applied = app
        .client()
        .post("/api/admin/migrate-catalog-ids")
        .add_query_param("dryRun", "false")
        .authorization_bearer(TEST_TOKEN)
        .await;
    applied.assert_status_ok();
    let applied: Value = applied.json();
    assert_eq!(applied["dryRun"], false);
    assert_eq!(applied["migrated"], 1);
    assert_eq!(applied["failed"], 0);
    assert_eq!(applied["changes"][0]["from"], "LMSY-ED-2023-004");
    assert_eq!(applied["changes"][0]["to"], "LMSY-MAG-20230309-004");

    let migrated = app.store.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(migrated.catalog_id, "LMSY-MAG-20230309-004");
    assert_eq!(
        migrated.storage_path,
        "magazines/2023/LMSY-MAG-20230309-004.webp"
    );
    assert!(app.storage.exists(&migrated.storage_path).await.unwrap());
    assert!(!app.storage.exists(legacy_key).await.unwrap());
}

#[tokio::test]
async fn test_admin_routes_require_token() {
    let app = setup_test_app().await;

    app.client()
        .get("/api/admin/reconcile")
        .await
        .assert_status_unauthorized();
    app.client()
        .post("/api/admin/migrate-catalog-ids")
        .authorization_bearer("wrong")
        .await
        .assert_status_unauthorized();
}
