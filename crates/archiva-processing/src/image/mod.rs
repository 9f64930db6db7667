//! Image transcoding

mod processor;

pub use processor::{ImageTranscoder, WebpImage};
