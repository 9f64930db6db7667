//! Browser-like request headers and hotlink referer overrides.

use rand::Rng;

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1",
];

/// Host suffix → referer expected by that CDN's hotlink protection.
const REFERER_OVERRIDES: &[(&str, &str)] = &[
    ("sinaimg.cn", "https://weibo.com/"),
    ("weibo.com", "https://weibo.com/"),
    ("weibo.cn", "https://weibo.com/"),
    ("xhscdn.com", "https://www.xiaohongshu.com/"),
    ("xiaohongshu.com", "https://www.xiaohongshu.com/"),
    ("pbs.twimg.com", "https://x.com/"),
    ("cdninstagram.com", "https://www.instagram.com/"),
    ("fbcdn.net", "https://www.instagram.com/"),
];

pub fn random_user_agent() -> &'static str {
    let index = rand::rng().random_range(0..USER_AGENTS.len());
    USER_AGENTS[index]
}

/// Referer to send for `host`, if the host is known to enforce one.
pub fn referer_for(host: &str) -> Option<&'static str> {
    let host = host.trim_end_matches('.').to_lowercase();
    REFERER_OVERRIDES
        .iter()
        .find(|(suffix, _)| host == *suffix || host.ends_with(&format!(".{}", suffix)))
        .map(|(_, referer)| *referer)
}

pub(crate) fn default_headers(user_agent: &str) -> reqwest::header::HeaderMap {
    use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};

    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(user_agent) {
        headers.insert(USER_AGENT, value);
    }
    headers.insert(ACCEPT, HeaderValue::from_static("image/*,video/*,*/*;q=0.8"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert("dnt", HeaderValue::from_static("1"));
    headers.insert("sec-fetch-dest", HeaderValue::from_static("image"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("no-cors"));
    headers.insert("sec-fetch-site", HeaderValue::from_static("cross-site"));
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_cdns_get_platform_referer() {
        assert_eq!(referer_for("wx1.sinaimg.cn"), Some("https://weibo.com/"));
        assert_eq!(referer_for("ci.xiaohongshu.com"), Some("https://www.xiaohongshu.com/"));
        assert_eq!(referer_for("sns-img-qc.xhscdn.com"), Some("https://www.xiaohongshu.com/"));
        assert_eq!(referer_for("PBS.TWIMG.COM"), Some("https://x.com/"));
        assert_eq!(
            referer_for("scontent-sin6-2.cdninstagram.com"),
            Some("https://www.instagram.com/")
        );
    }

    #[test]
    fn unknown_and_lookalike_hosts_get_none() {
        assert_eq!(referer_for("img.example"), None);
        assert_eq!(referer_for("notsinaimg.cn"), None);
    }

    #[test]
    fn user_agent_comes_from_pool() {
        for _ in 0..10 {
            assert!(USER_AGENTS.contains(&random_user_agent()));
        }
    }

    #[test]
    fn default_headers_are_browser_like() {
        let headers = default_headers(USER_AGENTS[0]);
        assert_eq!(headers["user-agent"], USER_AGENTS[0]);
        assert!(headers.contains_key("accept"));
        assert!(headers.contains_key("sec-fetch-mode"));
    }
}
