//! Archiva Processing Library
//!
//! CPU-bound media work for the ingestion pipeline: content hashing, image
//! re-encoding with inline blur previews, and video probing.

pub mod hasher;
pub mod transcoder;

#[cfg(feature = "image")]
pub mod image;
#[cfg(feature = "video")]
pub mod video;

pub use hasher::content_hash;
pub use transcoder::{
    content_type_for_extension, AssetTranscoder, TranscodeError, TranscodedAsset,
};

#[cfg(feature = "image")]
pub use crate::image::{ImageTranscoder, WebpImage};
#[cfg(feature = "video")]
pub use video::{VideoMetadata, VideoProbe};
