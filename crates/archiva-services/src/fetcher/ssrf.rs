//! SSRF (Server-Side Request Forgery) validation for media URLs.
//!
//! Media URLs come from untrusted callers. Before fetching, reject anything that
//! is not plain http(s) or that resolves to loopback, private, link-local or
//! otherwise internal addresses.

use std::net::{IpAddr, Ipv6Addr};

use tokio::net::lookup_host;

use super::error::FetchError;

/// Parse and vet a media URL. Syntax errors are reported before any I/O.
///
/// With `allow_private_hosts` only the syntax and scheme checks run.
pub async fn validate_media_url(
    raw: &str,
    allow_private_hosts: bool,
) -> Result<reqwest::Url, FetchError> {
    let url = parse_media_url(raw)?;
    if allow_private_hosts {
        return Ok(url);
    }

    let host = url
        .host_str()
        .ok_or_else(|| FetchError::InvalidUrl("URL must have a host".to_string()))?;
    let host = host.trim_start_matches('[').trim_end_matches(']');

    if let Ok(ip) = host.parse::<IpAddr>() {
        if is_private_ip(&ip) {
            return Err(FetchError::Blocked(
                "Private/internal IP addresses are not allowed".to_string(),
            ));
        }
        return Ok(url);
    }

    let host_lower = host.to_lowercase();
    if host_lower == "localhost"
        || host_lower.ends_with(".localhost")
        || host_lower.ends_with(".local")
        || host_lower.ends_with(".internal")
    {
        return Err(FetchError::Blocked(
            "Localhost and internal hostnames are not allowed".to_string(),
        ));
    }

    let port = url.port_or_known_default().unwrap_or(443);
    let addrs = lookup_host((host_lower.as_str(), port)).await.map_err(|e| {
        tracing::warn!(host = %host_lower, error = %e, "DNS resolution failed for media url");
        FetchError::Network(format!("Hostname could not be resolved: {}", e))
    })?;

    for addr in addrs {
        if is_private_ip(&addr.ip()) {
            return Err(FetchError::Blocked(format!(
                "Hostname resolves to private/internal IP address: {}",
                addr.ip()
            )));
        }
    }

    Ok(url)
}

pub(crate) fn parse_media_url(raw: &str) -> Result<reqwest::Url, FetchError> {
    let trimmed = raw.trim();
    let url = reqwest::Url::parse(trimmed)
        .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", trimmed, e)))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(FetchError::InvalidUrl(
            "URL must start with http:// or https://".to_string(),
        ));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(FetchError::InvalidUrl("URL must have a host".to_string()));
    }
    Ok(url)
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            let octets = ipv4.octets();
            octets[0] == 10
                || (octets[0] == 172 && (16..=31).contains(&octets[1]))
                || (octets[0] == 192 && octets[1] == 168)
                || (octets[0] == 100 && (64..=127).contains(&octets[1]))
                || octets[0] == 127
                || (octets[0] == 169 && octets[1] == 254)
                || (224..=239).contains(&octets[0])
                || octets[0] == 0
                || ipv4.is_broadcast()
        }
        IpAddr::V6(ipv6) => {
            // IPv4-mapped addresses (::ffff:a.b.c.d) would bypass the V4 checks.
            if let Some(ipv4) = ipv6.to_ipv4_mapped() {
                return is_private_ip(&IpAddr::V4(ipv4));
            }
            ipv6.is_loopback()
                || ipv6.is_unspecified()
                || ipv6.is_multicast()
                || is_ipv6_link_local(ipv6)
                || is_ipv6_unique_local(ipv6)
        }
    }
}

fn is_ipv6_link_local(ip: &Ipv6Addr) -> bool {
    ip.segments()[0] & 0xffc0 == 0xfe80
}

fn is_ipv6_unique_local(ip: &Ipv6Addr) -> bool {
    ip.segments()[0] & 0xfe00 == 0xfc00
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_malformed_and_non_http_urls() {
        for raw in ["not a url", "ftp://example.com/a.jpg", "file:///etc/passwd", ""] {
            assert!(matches!(
                validate_media_url(raw, false).await,
                Err(FetchError::InvalidUrl(_))
            ));
        }
    }

    #[tokio::test]
    async fn rejects_private_literals() {
        for raw in [
            "http://127.0.0.1/a.jpg",
            "http://10.0.0.8/a.jpg",
            "http://192.168.1.1/a.jpg",
            "http://169.254.169.254/latest/meta-data",
            "http://[::1]/a.jpg",
            "http://[::ffff:127.0.0.1]/a.jpg",
            "http://localhost:8080/a.jpg",
        ] {
            assert!(
                matches!(validate_media_url(raw, false).await, Err(FetchError::Blocked(_))),
                "{raw} should be blocked"
            );
        }
    }

    #[tokio::test]
    async fn allow_private_hosts_skips_address_checks() {
        assert!(validate_media_url("http://127.0.0.1:9/a.jpg", true).await.is_ok());
    }

    #[tokio::test]
    async fn public_literal_is_accepted() {
        let url = validate_media_url("https://93.184.216.34/a.jpg", false)
            .await
            .unwrap();
        assert_eq!(url.path(), "/a.jpg");
    }
}
