use archiva_core::{AssetMetadata, IngestionStage, MediaType, NewAsset, TranslationStatus};

pub fn new_asset(catalog_id: &str, hash: &str) -> NewAsset {
    NewAsset {
        catalog_id: catalog_id.to_string(),
        event_date: None,
        source_url: Some("https://x.com/lmsy/status/1".to_string()),
        source_platform: "twitter".to_string(),
        source_post_id: None,
        content_hash: hash.to_string(),
        storage_path: format!("magazines/2024/{}.webp", catalog_id),
        storage_url: format!("http://localhost/magazines/2024/{}.webp", catalog_id),
        media_type: MediaType::Image,
        metadata: AssetMetadata::default(),
        blur_data_url: None,
        title: None,
        description: None,
        tags: vec![],
        translation_status: TranslationStatus::Pending,
        ingestion_stage: IngestionStage::Translating,
        notes: None,
    }
}
