//! Dapp host normalization.
//!
//! Sessions are keyed by the page origin's host (port included) with a
//! leading `www.` removed, so `https://www.app.example` and
//! `https://app.example/swap` share one session.

use url::Url;

/// Normalized host for a page URL. `None` for non-http(s) or unparsable URLs.
pub fn dapp_host(page_url: &str) -> Option<String> {
    let url = Url::parse(page_url).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let host = url.host_str()?;
    let host = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };
    Some(normalize_host(&host))
}

/// Strip a leading `www.` and lower-case.
pub fn normalize_host(host: &str) -> String {
    let lower = host.trim().to_ascii_lowercase();
    match lower.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => lower,
    }
}

/// Whether `page_url` can host a provider session.
pub fn is_valid_page_url(page_url: &str) -> bool {
    dapp_host(page_url).is_some()
}
