use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

/// Small JPEG whose pixels, and so whose hash, depend on `seed`.
pub fn jpeg(seed: u8) -> Vec<u8> {
    let img = RgbImage::from_fn(32, 24, |x, y| {
        Rgb([
            seed.wrapping_add(x as u8 * 7),
            seed.wrapping_mul(3).wrapping_add(y as u8 * 5),
            (x as u8).wrapping_add(y as u8),
        ])
    });
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)
        .unwrap();
    bytes
}

/// Serve `body` as an image at `path` on a mockito origin.
pub async fn serve_image(server: &mut mockito::ServerGuard, path: &str, body: Vec<u8>) -> mockito::Mock {
    server
        .mock("GET", path)
        .with_status(200)
        .with_header("content-type", "image/jpeg")
        .with_body(body)
        .create_async()
        .await
}

pub fn chat_completion(content: &str) -> String {
    serde_json::json!({
        "choices": [{"message": {"role": "assistant", "content": content}}]
    })
    .to_string()
}

/// Record as the ingestion path would have written it.
pub fn new_asset(catalog_id: &str, hash: &str, storage_path: &str) -> archiva_core::NewAsset {
    use archiva_core::{AssetMetadata, IngestionStage, MediaType, TranslationStatus};

    archiva_core::NewAsset {
        catalog_id: catalog_id.to_string(),
        event_date: None,
        source_url: Some("https://x.com/lmsy/status/1".to_string()),
        source_platform: "twitter".to_string(),
        source_post_id: None,
        content_hash: hash.to_string(),
        storage_path: storage_path.to_string(),
        storage_url: format!("http://localhost:3000/media/{}", storage_path),
        media_type: MediaType::Image,
        metadata: AssetMetadata::default(),
        blur_data_url: None,
        title: None,
        description: None,
        tags: vec![],
        translation_status: TranslationStatus::Skipped,
        ingestion_stage: IngestionStage::Ready,
        notes: None,
    }
}
