//! Video metadata extraction

mod probe;

pub use probe::{VideoMetadata, VideoProbe};
