//! Media fetcher
//!
//! Downloads remote media with browser-like headers, a hard deadline and a
//! byte ceiling that holds whether or not the server sends `Content-Length`.

mod client;
mod error;
mod extension;
mod headers;
mod ssrf;

pub use client::{FetchOptions, FetchedMedia, MediaFetcher};
pub use error::FetchError;
pub use extension::{
    extension_from_content_type, extension_from_url, media_type_for_extension, resolve_extension,
};
pub use headers::{random_user_agent, referer_for};
pub use ssrf::validate_media_url;
