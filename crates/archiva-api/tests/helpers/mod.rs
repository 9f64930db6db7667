//! Test helpers: build AppState and router for integration tests.
//!
//! The app runs over the in-memory asset store and local storage in a temp
//! dir, so no Docker is needed. Media origins are mockito servers.

pub mod fixtures;

use std::sync::Arc;
use std::time::Duration;

use archiva_api::setup::{routes, services};
use archiva_api::AppState;
use archiva_core::{BaseConfig, Config, IngestConfig, IngestedAsset, IngestionStage, StorageBackend};
use archiva_db::InMemoryAssetStore;
use archiva_storage::LocalStorage;
use axum_test::TestServer;
use serde_json::Value;
use tempfile::TempDir;

pub const TEST_TOKEN: &str = "test-ingest-token";

pub struct TestApp {
    pub server: TestServer,
    pub store: Arc<InMemoryAssetStore>,
    pub storage: Arc<LocalStorage>,
    pub state: Arc<AppState>,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub async fn ingest(&self, body: Value) -> axum_test::TestResponse {
        self.server
            .post("/api/ingest")
            .authorization_bearer(TEST_TOKEN)
            .json(&body)
            .await
    }

    /// Poll the asset until it leaves the `translating` stage.
    pub async fn wait_until_settled(&self, id: &str) -> IngestedAsset {
        for _ in 0..100 {
            let response = self
                .server
                .get(&format!("/api/assets/{}", id))
                .authorization_bearer(TEST_TOKEN)
                .await;
            response.assert_status_ok();
            let asset: IngestedAsset = response.json();
            if asset.ingestion_stage != IngestionStage::Translating {
                return asset;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("asset {} never left the translating stage", id);
    }
}

pub fn test_config() -> IngestConfig {
    IngestConfig {
        base: BaseConfig::default(),
        database_url: "postgres://unused".to_string(),
        storage_backend: Some(StorageBackend::Local),
        ingest_api_tokens: vec![TEST_TOKEN.to_string()],
        fetch_timeout_seconds: 5,
        fetch_allow_private_hosts: true,
        transcode_concurrency: 2,
        ..IngestConfig::default()
    }
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(test_config(), InMemoryAssetStore::new()).await
}

pub async fn setup_test_app_with(config: IngestConfig, store: InMemoryAssetStore) -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let storage = Arc::new(
        LocalStorage::new(temp_dir.path(), "http://localhost:3000/media".to_string())
            .await
            .unwrap(),
    );
    let store = Arc::new(store);
    let config = Config::from(config);

    let state = services::initialize_services(&config, store.clone(), storage.clone()).unwrap();
    let router = routes::setup_routes(&config, state.clone()).unwrap();
    let server = TestServer::new(router).unwrap();

    TestApp {
        server,
        store,
        storage,
        state,
        _temp_dir: temp_dir,
    }
}
