//! File extension resolution for fetched media.

use archiva_core::MediaType;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "avif", "heic", "heif"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "avi", "mkv", "m4v"];

/// Known media extension at the end of the URL path, lowercased.
pub fn extension_from_url(url: &reqwest::Url) -> Option<String> {
    let file_name = url.path_segments()?.next_back()?;
    let (_, ext) = file_name.rsplit_once('.')?;
    let ext = ext.to_lowercase();
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) || VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Some(ext)
    } else {
        None
    }
}

pub fn extension_from_content_type(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next()?.trim().to_lowercase();
    let ext = match essence.as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/avif" => "avif",
        "image/heic" => "heic",
        "image/heif" => "heif",
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/quicktime" => "mov",
        "video/x-msvideo" => "avi",
        "video/x-matroska" => "mkv",
        _ => return None,
    };
    Some(ext)
}

/// URL path suffix, then `Content-Type`, then the family default
/// (`jpg` for images, `mp4` for videos). `None` when nothing points at media.
pub fn resolve_extension(url: &reqwest::Url, content_type: &str) -> Option<String> {
    if let Some(ext) = extension_from_url(url) {
        return Some(ext);
    }
    if let Some(ext) = extension_from_content_type(content_type) {
        return Some(ext.to_string());
    }
    match MediaType::from_content_type(content_type)? {
        MediaType::Image => Some("jpg".to_string()),
        MediaType::Video => Some("mp4".to_string()),
    }
}

/// Media family implied by an extension.
pub fn media_type_for_extension(extension: &str) -> Option<MediaType> {
    if IMAGE_EXTENSIONS.contains(&extension) {
        Some(MediaType::Image)
    } else if VIDEO_EXTENSIONS.contains(&extension) {
        Some(MediaType::Video)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(raw: &str) -> reqwest::Url {
        reqwest::Url::parse(raw).unwrap()
    }

    #[test]
    fn url_suffix_wins() {
        assert_eq!(
            resolve_extension(&url("https://img.example/a/b.PNG?x=1"), "image/jpeg"),
            Some("png".to_string())
        );
    }

    #[test]
    fn content_type_used_when_path_has_no_media_suffix() {
        assert_eq!(
            resolve_extension(&url("https://img.example/media/123"), "video/quicktime"),
            Some("mov".to_string())
        );
        assert_eq!(
            resolve_extension(&url("https://img.example/page.html"), "image/webp; q=1"),
            Some("webp".to_string())
        );
    }

    #[test]
    fn family_defaults() {
        assert_eq!(
            resolve_extension(&url("https://img.example/x"), "image/x-unknown"),
            Some("jpg".to_string())
        );
        assert_eq!(
            resolve_extension(&url("https://img.example/x"), "video/x-unknown"),
            Some("mp4".to_string())
        );
        assert_eq!(resolve_extension(&url("https://img.example/x"), "text/html"), None);
    }

    #[test]
    fn extension_family() {
        assert_eq!(media_type_for_extension("jpg"), Some(MediaType::Image));
        assert_eq!(media_type_for_extension("mkv"), Some(MediaType::Video));
        assert_eq!(media_type_for_extension("pdf"), None);
    }
}
