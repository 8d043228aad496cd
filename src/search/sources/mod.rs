// src/search/sources/mod.rs
//! One adapter per portal. Each owns its query encoding and result
//! extraction; the shared pieces here are the HTTP client shape and the
//! page-to-text normalization every scraping adapter needs.

pub mod careers_gov;
pub mod linkedin;
pub mod mycareersfuture;

use std::time::Duration;

use once_cell::sync::OnceCell;
use regex::Regex;
use reqwest::StatusCode;

use crate::search::types::FetchError;

/// Browser-ish user agent; the portals answer differently to bare clients.
pub(crate) const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

pub(crate) fn portal_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(4))
        .timeout(Duration::from_secs(10))
        .build()
        .expect("reqwest client")
}

pub(crate) fn transport_error(e: reqwest::Error) -> FetchError {
    FetchError::Unreachable(e.to_string())
}

/// Classify a non-success status. 403/429 (and LinkedIn's 999) are the
/// portal telling us off, which we must not retry.
pub(crate) fn classify_status(status: StatusCode) -> Option<FetchError> {
    if status.is_success() {
        return None;
    }
    let blocked = matches!(status.as_u16(), 403 | 429 | 999);
    Some(if blocked {
        FetchError::Blocked(format!("status {status}"))
    } else {
        FetchError::Unreachable(format!("status {status}"))
    })
}

/// Reduce an HTML document to readable text: drop script/style, strip tags,
/// decode entities, collapse whitespace.
pub(crate) fn page_text(html: &str) -> String {
    static RE_SKIP: OnceCell<Regex> = OnceCell::new();
    let re_skip = RE_SKIP.get_or_init(|| {
        Regex::new(r"(?is)<(script|style|noscript)[^>]*>.*?</(script|style|noscript)>").unwrap()
    });
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());

    let out = re_skip.replace_all(html, " ");
    let out = re_tags.replace_all(&out, " ");
    let out = html_escape::decode_html_entities(&out).to_string();
    re_ws.replace_all(&out, " ").trim().to_string()
}

/// GET a posting page and return its readable text.
pub(crate) async fn fetch_page_text(
    http: &reqwest::Client,
    url: &str,
) -> Result<String, FetchError> {
    let resp = http.get(url).send().await.map_err(transport_error)?;
    if let Some(err) = classify_status(resp.status()) {
        return Err(err);
    }
    let body = resp.text().await.map_err(transport_error)?;
    Ok(page_text(&body))
}
