//! Image processor - decode, re-encode to WebP, derive blur placeholders

use anyhow::{anyhow, Context, Result};
use base64::Engine;
use image::imageops::FilterType;
use image::metadata::Orientation;
use image::{DynamicImage, GenericImageView, ImageDecoder, ImageReader};
use std::io::Cursor;

const PREVIEW_EDGE: u32 = 20;
const PREVIEW_QUALITY: f32 = 50.0;

/// Output of a successful WebP conversion.
#[derive(Debug, Clone)]
pub struct WebpImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Re-encodes images to WebP at a fixed quality.
#[derive(Debug, Clone)]
pub struct ImageTranscoder {
    quality: f32,
}

impl ImageTranscoder {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: f32::from(quality.clamp(1, 100)),
        }
    }

    /// Decode any supported raster format and apply its EXIF orientation.
    pub fn decode(data: &[u8]) -> Result<DynamicImage> {
        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .context("Failed to sniff image format")?;
        if reader.format().is_none() {
            return Err(anyhow!("Unrecognised image format"));
        }

        let mut decoder = reader.into_decoder().context("Failed to open image decoder")?;
        let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
        let mut img = DynamicImage::from_decoder(decoder).context("Failed to decode image")?;
        img.apply_orientation(orientation);
        Ok(img)
    }

    /// Encode `img` as lossy WebP at the configured quality.
    pub fn to_webp(&self, img: &DynamicImage) -> Result<WebpImage> {
        let (width, height) = img.dimensions();
        let data = encode_webp(img, self.quality)?;

        tracing::debug!(
            width = width,
            height = height,
            quality = self.quality,
            size_bytes = data.len(),
            "Image encoded to WebP"
        );

        Ok(WebpImage {
            data,
            width,
            height,
        })
    }

    /// 20x20 cover-cropped WebP rendered as a `data:` URL.
    pub fn blur_preview(img: &DynamicImage) -> Result<String> {
        let thumbnail = img.resize_to_fill(PREVIEW_EDGE, PREVIEW_EDGE, FilterType::Triangle);
        let data = encode_webp(&thumbnail, PREVIEW_QUALITY)?;
        Ok(format!(
            "data:image/webp;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(data)
        ))
    }
}

fn encode_webp(img: &DynamicImage, quality: f32) -> Result<Vec<u8>> {
    let (width, height) = img.dimensions();
    let rgba = img.to_rgba8();
    let encoder = webp::Encoder::from_rgba(&rgba, width, height);
    let memory = encoder
        .encode_simple(false, quality)
        .map_err(|e| anyhow!("WebP encoding failed: {:?}", e))?;
    Ok(memory.to_vec())
}
