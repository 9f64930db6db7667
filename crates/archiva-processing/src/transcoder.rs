//! Asset transcoder
//!
//! Turns fetched bytes into the stored representation: images become WebP with
//! a blur placeholder, videos are stored unchanged with whatever metadata
//! ffprobe yields. Only an undecodable image is fatal; preview and metadata
//! extraction failures leave the corresponding fields empty.

use std::sync::Arc;

use archiva_core::{AppError, AssetMetadata, MediaType};
use bytes::Bytes;
use tokio::sync::Semaphore;

#[cfg(feature = "image")]
use crate::image::ImageTranscoder;
#[cfg(feature = "video")]
use crate::video::VideoProbe;

#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    #[error("unsupported media: {0}")]
    Unsupported(String),

    #[error("media could not be decoded: {0}")]
    Undecodable(String),

    #[error("encoding failed: {0}")]
    Encode(String),

    #[error("transcode worker failed: {0}")]
    Worker(String),
}

impl From<TranscodeError> for AppError {
    fn from(err: TranscodeError) -> Self {
        match err {
            TranscodeError::Unsupported(_) | TranscodeError::Undecodable(_) => {
                AppError::UnsupportedMedia(err.to_string())
            }
            TranscodeError::Encode(_) | TranscodeError::Worker(_) => {
                AppError::Internal(err.to_string())
            }
        }
    }
}

/// Stored representation of one asset.
#[derive(Debug, Clone)]
pub struct TranscodedAsset {
    pub bytes: Bytes,
    /// Extension of the stored object, without the dot.
    pub extension: String,
    pub content_type: String,
    pub metadata: AssetMetadata,
    pub blur_data_url: Option<String>,
}

/// Runs CPU-bound transcodes on the blocking pool, at most `concurrency` at once.
#[derive(Clone)]
pub struct AssetTranscoder {
    #[cfg_attr(not(feature = "image"), allow(dead_code))]
    quality: u8,
    #[cfg(feature = "video")]
    probe: Option<VideoProbe>,
    permits: Arc<Semaphore>,
}

impl AssetTranscoder {
    pub fn new(quality: u8, ffprobe_path: &str, concurrency: usize) -> Self {
        #[cfg(feature = "video")]
        let probe = match VideoProbe::new(ffprobe_path) {
            Ok(probe) => Some(probe),
            Err(e) => {
                tracing::warn!(error = %e, "Video metadata extraction disabled");
                None
            }
        };
        #[cfg(not(feature = "video"))]
        let _ = ffprobe_path;

        Self {
            quality,
            #[cfg(feature = "video")]
            probe,
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
        }
    }

    #[tracing::instrument(skip(self, data), fields(media_type = %media_type, size_bytes = data.len()))]
    pub async fn transcode(
        &self,
        data: Bytes,
        media_type: MediaType,
        source_extension: &str,
    ) -> Result<TranscodedAsset, TranscodeError> {
        match media_type {
            MediaType::Image => self.transcode_image(data).await,
            MediaType::Video => Ok(self.pass_through_video(data, source_extension).await),
        }
    }

    /// Blur placeholder for already-stored bytes. Failures yield `None`.
    pub async fn preview(&self, data: Bytes, media_type: MediaType) -> Option<String> {
        if media_type != MediaType::Image {
            return None;
        }
        #[cfg(feature = "image")]
        {
            let _permit = self.permits.clone().acquire_owned().await.ok()?;
            let result = tokio::task::spawn_blocking(move || {
                let img = ImageTranscoder::decode(&data)?;
                ImageTranscoder::blur_preview(&img)
            })
            .await;
            match result {
                Ok(Ok(preview)) => Some(preview),
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "Preview generation failed");
                    None
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Preview worker failed");
                    None
                }
            }
        }
        #[cfg(not(feature = "image"))]
        {
            let _ = data;
            None
        }
    }

    #[cfg(feature = "image")]
    async fn transcode_image(&self, data: Bytes) -> Result<TranscodedAsset, TranscodeError> {
        let _permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| TranscodeError::Worker(e.to_string()))?;
        let quality = self.quality;

        let (webp, blur_data_url) = tokio::task::spawn_blocking(move || {
            let img = ImageTranscoder::decode(&data)
                .map_err(|e| TranscodeError::Undecodable(format!("{:#}", e)))?;
            let webp = ImageTranscoder::new(quality)
                .to_webp(&img)
                .map_err(|e| TranscodeError::Encode(format!("{:#}", e)))?;
            let preview = match ImageTranscoder::blur_preview(&img) {
                Ok(preview) => Some(preview),
                Err(e) => {
                    tracing::warn!(error = %e, "Blur preview generation failed");
                    None
                }
            };
            Ok::<_, TranscodeError>((webp, preview))
        })
        .await
        .map_err(|e| TranscodeError::Worker(e.to_string()))??;

        let size_bytes = webp.data.len() as u64;
        Ok(TranscodedAsset {
            bytes: Bytes::from(webp.data),
            extension: "webp".to_string(),
            content_type: "image/webp".to_string(),
            metadata: AssetMetadata {
                width: Some(webp.width),
                height: Some(webp.height),
                duration_seconds: None,
                size_bytes,
                format: "webp".to_string(),
            },
            blur_data_url,
        })
    }

    #[cfg(not(feature = "image"))]
    async fn transcode_image(&self, _data: Bytes) -> Result<TranscodedAsset, TranscodeError> {
        Err(TranscodeError::Unsupported(
            "image support is not compiled in".to_string(),
        ))
    }

    async fn pass_through_video(&self, data: Bytes, source_extension: &str) -> TranscodedAsset {
        let extension = match source_extension.trim_start_matches('.').to_lowercase() {
            ext if ext.is_empty() => "mp4".to_string(),
            ext => ext,
        };

        let mut metadata = AssetMetadata {
            size_bytes: data.len() as u64,
            format: extension.clone(),
            ..Default::default()
        };

        #[cfg(feature = "video")]
        if let Some(ref probe) = self.probe {
            match probe.probe(&data).await {
                Ok(probed) => {
                    metadata.width = probed.width;
                    metadata.height = probed.height;
                    metadata.duration_seconds = probed.duration_seconds;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Video probe failed, storing without metadata");
                }
            }
        }

        TranscodedAsset {
            content_type: content_type_for_extension(&extension).to_string(),
            bytes: data,
            extension,
            metadata,
            blur_data_url: None,
        }
    }
}

/// MIME type stored alongside an object with this extension.
pub fn content_type_for_extension(extension: &str) -> &'static str {
    match extension.trim_start_matches('.').to_lowercase().as_str() {
        "webp" => "image/webp",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "avif" => "image/avif",
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "image")]
    fn jpeg_bytes() -> Bytes {
        use image::{ImageFormat, Rgb, RgbImage};
        let img = RgbImage::from_pixel(32, 24, Rgb([120, 80, 40]));
        let mut buffer = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut buffer), ImageFormat::Jpeg)
            .unwrap();
        Bytes::from(buffer)
    }

    fn transcoder() -> AssetTranscoder {
        AssetTranscoder::new(90, "/nonexistent/ffprobe", 2)
    }

    #[cfg(feature = "image")]
    #[tokio::test]
    async fn test_image_becomes_webp_with_preview() {
        let out = transcoder()
            .transcode(jpeg_bytes(), MediaType::Image, "jpg")
            .await
            .unwrap();
        assert_eq!(out.extension, "webp");
        assert_eq!(out.content_type, "image/webp");
        assert_eq!(out.metadata.width, Some(32));
        assert_eq!(out.metadata.height, Some(24));
        assert_eq!(out.metadata.size_bytes, out.bytes.len() as u64);
        assert!(out
            .blur_data_url
            .as_deref()
            .is_some_and(|p| p.starts_with("data:image/webp;base64,")));
    }

    #[tokio::test]
    async fn test_undecodable_image_is_unsupported() {
        let err = transcoder()
            .transcode(Bytes::from_static(b"<html>nope</html>"), MediaType::Image, "jpg")
            .await
            .unwrap_err();
        let app: AppError = err.into();
        assert!(matches!(app, AppError::UnsupportedMedia(_)));
    }

    #[tokio::test]
    async fn test_video_passes_through_when_probe_fails() {
        let data = Bytes::from_static(b"\x00\x00\x00\x18ftypmp42 not really a video");
        let out = transcoder()
            .transcode(data.clone(), MediaType::Video, "MP4")
            .await
            .unwrap();
        assert_eq!(out.bytes, data);
        assert_eq!(out.extension, "mp4");
        assert_eq!(out.content_type, "video/mp4");
        assert_eq!(out.metadata.size_bytes, data.len() as u64);
        assert_eq!(out.metadata.duration_seconds, None);
        assert!(out.blur_data_url.is_none());
    }

    #[tokio::test]
    async fn test_preview_of_garbage_is_none() {
        assert!(transcoder()
            .preview(Bytes::from_static(b"garbage"), MediaType::Image)
            .await
            .is_none());
        assert!(transcoder()
            .preview(Bytes::from_static(b"garbage"), MediaType::Video)
            .await
            .is_none());
    }
}
