use std::time::Duration;

use archiva_core::{Config, MediaType};
use bytes::{Bytes, BytesMut};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, LOCATION, REFERER};

use super::error::FetchError;
use super::extension::{media_type_for_extension, resolve_extension};
use super::headers::{default_headers, random_user_agent, referer_for};
use super::ssrf::{parse_media_url, validate_media_url};

/// Per-call limits. Defaults come from configuration.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub max_bytes: u64,
    /// Wins over the host-based referer table.
    pub referer: Option<String>,
}

impl FetchOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: Duration::from_secs(config.fetch_timeout_seconds()),
            max_bytes: config.fetch_max_bytes(),
            referer: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchedMedia {
    pub bytes: Bytes,
    pub content_type: String,
    /// Resolved extension without the dot; `None` if neither the URL nor the
    /// content type points at a known media format.
    pub extension: Option<String>,
    pub url: reqwest::Url,
}

impl FetchedMedia {
    /// Media family from the `Content-Type`, falling back to the extension.
    pub fn media_type(&self) -> Option<MediaType> {
        MediaType::from_content_type(&self.content_type)
            .or_else(|| self.extension.as_deref().and_then(media_type_for_extension))
    }
}

/// HTTP client for third-party media.
#[derive(Clone)]
pub struct MediaFetcher {
    client: reqwest::Client,
    allow_private_hosts: bool,
}

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_REDIRECTS: usize = 5;

impl MediaFetcher {
    pub fn new(allow_private_hosts: bool) -> Result<Self, FetchError> {
        // Redirects are followed by hand so every hop passes the address guard.
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| FetchError::Network(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            allow_private_hosts,
        })
    }

    /// Download `raw_url` within `options.timeout`, never buffering more than
    /// `options.max_bytes`. The deadline covers DNS checks and redirects.
    #[tracing::instrument(skip(self, options), fields(http.url = %raw_url, max_bytes = options.max_bytes))]
    pub async fn fetch(
        &self,
        raw_url: &str,
        options: &FetchOptions,
    ) -> Result<FetchedMedia, FetchError> {
        // Syntax errors never wait on the network.
        parse_media_url(raw_url)?;
        let start = std::time::Instant::now();

        let result = tokio::time::timeout(options.timeout, self.download(raw_url, options)).await;
        let media = match result {
            Ok(Ok(media)) => media,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Media fetch failed");
                return Err(e);
            }
            Err(_) => {
                tracing::warn!(timeout = ?options.timeout, "Media fetch timed out");
                return Err(FetchError::Timeout(options.timeout));
            }
        };

        tracing::info!(
            content_type = %media.content_type,
            extension = ?media.extension,
            size_bytes = media.bytes.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Media fetch successful"
        );
        Ok(media)
    }

    fn request(&self, url: &reqwest::Url, options: &FetchOptions) -> reqwest::RequestBuilder {
        let mut request = self
            .client
            .get(url.clone())
            .headers(default_headers(random_user_agent()));

        let referer = options
            .referer
            .as_deref()
            .or_else(|| url.host_str().and_then(referer_for));
        if let Some(referer) = referer {
            request = request.header(REFERER, referer);
        }
        request
    }

    async fn download(
        &self,
        raw_url: &str,
        options: &FetchOptions,
    ) -> Result<FetchedMedia, FetchError> {
        let mut url = validate_media_url(raw_url, self.allow_private_hosts).await?;
        let mut redirects = 0;

        let mut response = loop {
            let response = self
                .request(&url, options)
                .send()
                .await
                .map_err(map_reqwest_error)?;
            if !response.status().is_redirection() {
                break response;
            }
            if redirects == MAX_REDIRECTS {
                return Err(FetchError::Network(format!(
                    "more than {} redirects",
                    MAX_REDIRECTS
                )));
            }
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or(FetchError::Status(response.status().as_u16()))?;
            let next = next_hop(&url, location, self.allow_private_hosts).await?;
            tracing::debug!(from = %url, to = %next, "Following media redirect");
            url = next;
            redirects += 1;
        };

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();

        // Cheap rejection when the server is honest about the size.
        let declared = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        if let Some(declared) = declared {
            if declared > options.max_bytes {
                return Err(FetchError::TooLarge {
                    limit: options.max_bytes,
                    actual: declared,
                });
            }
        }

        // The declared length may be absent or wrong: count what actually arrives.
        let mut buffer = BytesMut::with_capacity(
            declared.unwrap_or(0).min(options.max_bytes).min(8 * 1024 * 1024) as usize,
        );
        while let Some(chunk) = response.chunk().await.map_err(map_reqwest_error)? {
            let received = (buffer.len() + chunk.len()) as u64;
            if received > options.max_bytes {
                return Err(FetchError::TooLarge {
                    limit: options.max_bytes,
                    actual: received,
                });
            }
            buffer.extend_from_slice(&chunk);
        }

        let extension = resolve_extension(&url, &content_type);
        Ok(FetchedMedia {
            bytes: buffer.freeze(),
            content_type,
            extension,
            url,
        })
    }
}

/// Resolve a `Location` header against the current URL and vet the target.
async fn next_hop(
    current: &reqwest::Url,
    location: &str,
    allow_private_hosts: bool,
) -> Result<reqwest::Url, FetchError> {
    let target = current
        .join(location)
        .map_err(|e| FetchError::InvalidUrl(format!("redirect to {}: {}", location, e)))?;
    validate_media_url(target.as_str(), allow_private_hosts).await
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(CONNECT_TIMEOUT)
    } else {
        FetchError::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn options(max_bytes: u64) -> FetchOptions {
        FetchOptions {
            timeout: Duration::from_secs(5),
            max_bytes,
            referer: None,
        }
    }

    fn fetcher() -> MediaFetcher {
        MediaFetcher::new(true).unwrap()
    }

    /// Serve one raw HTTP response without `Content-Length`, closing the
    /// connection to mark the end of the body.
    async fn serve_unsized_body(body: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut request = [0u8; 1024];
                let _ = socket.read(&mut request).await;
                let head = "HTTP/1.1 200 OK\r\nContent-Type: image/jpeg\r\nConnection: close\r\n\r\n";
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(&body).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{}/photo", addr)
    }

    /// Accept connections and never answer.
    async fn serve_silence() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        format!("http://{}/slow.jpg", addr)
    }

    #[tokio::test]
    async fn test_fetch_success_resolves_extension_from_url() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/media/a.PNG")
            .with_status(200)
            .with_header("content-type", "image/jpeg")
            .with_body(vec![1u8; 2048])
            .create_async()
            .await;

        let media = fetcher()
            .fetch(&format!("{}/media/a.PNG", server.url()), &options(4096))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(media.bytes.len(), 2048);
        assert_eq!(media.extension.as_deref(), Some("png"));
        assert_eq!(media.media_type(), Some(MediaType::Image));
    }

    #[tokio::test]
    async fn test_sends_browser_headers_and_explicit_referer() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v")
            .match_header("referer", "https://weibo.com/")
            .match_header("user-agent", mockito::Matcher::Regex("Mozilla/5.0".into()))
            .with_status(200)
            .with_header("content-type", "video/mp4")
            .with_body("mp4")
            .create_async()
            .await;

        let mut opts = options(1024);
        opts.referer = Some("https://weibo.com/".to_string());
        let media = fetcher()
            .fetch(&format!("{}/v", server.url()), &opts)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(media.extension.as_deref(), Some("mp4"));
        assert_eq!(media.media_type(), Some(MediaType::Video));
    }

    #[tokio::test]
    async fn test_non_success_status_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/gone.jpg")
            .with_status(404)
            .create_async()
            .await;

        let err = fetcher()
            .fetch(&format!("{}/gone.jpg", server.url()), &options(1024))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status(404)));
    }

    #[tokio::test]
    async fn test_declared_length_over_limit_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/big.jpg")
            .with_status(200)
            .with_header("content-type", "image/jpeg")
            .with_body(vec![0u8; 4096])
            .create_async()
            .await;

        let err = fetcher()
            .fetch(&format!("{}/big.jpg", server.url()), &options(1024))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::TooLarge { limit: 1024, .. }));
    }

    #[tokio::test]
    async fn test_oversize_rejected_without_content_length() {
        let url = serve_unsized_body(vec![7u8; 10_000]).await;
        let err = fetcher().fetch(&url, &options(4096)).await.unwrap_err();
        assert!(matches!(err, FetchError::TooLarge { limit: 4096, .. }));
    }

    #[tokio::test]
    async fn test_unsized_body_within_limit_is_accepted() {
        let url = serve_unsized_body(vec![7u8; 1000]).await;
        let media = fetcher().fetch(&url, &options(4096)).await.unwrap();
        assert_eq!(media.bytes.len(), 1000);
        // No suffix on the path: extension comes from the content type.
        assert_eq!(media.extension.as_deref(), Some("jpg"));
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        let url = serve_silence().await;
        let opts = FetchOptions {
            timeout: Duration::from_millis(200),
            max_bytes: 1024,
            referer: None,
        };
        let err = fetcher().fetch(&url, &opts).await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_malformed_url_fails_before_network() {
        let err = fetcher()
            .fetch("htp:/broken", &options(1024))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_redirect_is_followed_to_media() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/short")
            .with_status(302)
            .with_header("location", "/media/b.webp")
            .create_async()
            .await;
        let target = server
            .mock("GET", "/media/b.webp")
            .with_status(200)
            .with_header("content-type", "image/webp")
            .with_body(vec![3u8; 64])
            .create_async()
            .await;

        let media = fetcher()
            .fetch(&format!("{}/short", server.url()), &options(1024))
            .await
            .unwrap();

        target.assert_async().await;
        assert_eq!(media.url.path(), "/media/b.webp");
        assert_eq!(media.extension.as_deref(), Some("webp"));
    }

    #[tokio::test]
    async fn test_redirect_to_non_http_target_is_refused() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/hop")
            .with_status(301)
            .with_header("location", "file:///etc/passwd")
            .create_async()
            .await;

        let err = fetcher()
            .fetch(&format!("{}/hop", server.url()), &options(1024))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_redirect_chain_is_bounded() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/loop")
            .with_status(302)
            .with_header("location", "/loop")
            .expect(MAX_REDIRECTS + 1)
            .create_async()
            .await;

        let err = fetcher()
            .fetch(&format!("{}/loop", server.url()), &options(1024))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Network(msg) if msg.contains("redirects")));
    }

    #[tokio::test]
    async fn test_redirect_hop_to_internal_address_is_blocked() {
        let public = reqwest::Url::parse("https://93.184.216.34/a.jpg").unwrap();

        for location in [
            "http://169.254.169.254/latest/meta-data",
            "http://127.0.0.1:8080/admin",
            "http://localhost/a.jpg",
            "//10.0.0.8/a.jpg",
        ] {
            let err = next_hop(&public, location, false).await.unwrap_err();
            assert!(matches!(err, FetchError::Blocked(_)), "{location} should be blocked");
        }

        let relative = next_hop(&public, "/b.jpg", false).await.unwrap();
        assert_eq!(relative.as_str(), "https://93.184.216.34/b.jpg");
    }

    #[test]
    fn test_client_timeout_reports_connect_deadline() {
        let err = FetchError::Timeout(CONNECT_TIMEOUT);
        assert_eq!(err.to_string(), "no response within 10s");
    }
}
