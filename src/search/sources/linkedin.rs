// src/search/sources/linkedin.rs
//! LinkedIn job search cards. The site is aggressively anti-automation:
//! besides 403/429 it answers with status 999 or an auth-wall page, both of
//! which map to `Blocked` so the coordinator never retries them.

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::search::sources::{
    classify_status, fetch_page_text, page_text, portal_client, transport_error,
};
use crate::search::types::{FetchError, JobPosting, SearchQuery, SourceAdapter, SourceId};

const SEARCH_URL: &str = "https://www.linkedin.com/jobs/search/";
const MAX_RESULTS: usize = 3;

pub struct LinkedInAdapter {
    http: reqwest::Client,
}

impl LinkedInAdapter {
    pub fn new() -> Self {
        Self {
            http: portal_client(),
        }
    }
}

impl Default for LinkedInAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn is_auth_wall(body: &str) -> bool {
    body.contains("authwall") || body.contains("checkpoint/challenge")
}

/// Parse `job-search-card` blocks into (posting url, card title) pairs.
fn extract_cards(body: &str) -> Vec<(String, Option<String>)> {
    static RE_LINK: OnceCell<Regex> = OnceCell::new();
    let re_link = RE_LINK.get_or_init(|| {
        Regex::new(r#"(?is)<a[^>]+class="[^"]*base-card__full-link[^"]*"[^>]*href="([^"]+)""#)
            .unwrap()
    });
    static RE_TITLE: OnceCell<Regex> = OnceCell::new();
    let re_title = RE_TITLE.get_or_init(|| {
        Regex::new(r#"(?is)<h3[^>]*class="[^"]*base-search-card__title[^"]*"[^>]*>(.*?)</h3>"#)
            .unwrap()
    });

    body.split("job-search-card")
        .skip(1)
        .filter_map(|chunk| {
            let url = re_link.captures(chunk)?[1].trim().to_string();
            let title = re_title
                .captures(chunk)
                .map(|c| page_text(&c[1]))
                .filter(|t| !t.is_empty());
            Some((url, title))
        })
        .take(MAX_RESULTS)
        .collect()
}

#[async_trait::async_trait]
impl SourceAdapter for LinkedInAdapter {
    async fn fetch(&self, query: &SearchQuery) -> Result<Vec<JobPosting>, FetchError> {
        let keywords = format!("{} {}", query.title.trim(), query.company.trim());
        let resp = self
            .http
            .get(SEARCH_URL)
            .query(&[("keywords", keywords.as_str())])
            .send()
            .await
            .map_err(transport_error)?;
        if let Some(err) = classify_status(resp.status()) {
            return Err(err);
        }
        let body = resp.text().await.map_err(transport_error)?;
        if is_auth_wall(&body) {
            return Err(FetchError::Blocked("auth wall served".into()));
        }

        let cards = extract_cards(&body);
        let mut postings = Vec::with_capacity(cards.len());
        for (url, title) in cards {
            // Full posting text usually needs authentication; take the page
            // text when it is served and fall back to the card contents.
            let text = match fetch_page_text(&self.http, &url).await {
                Ok(t) if !t.is_empty() => t,
                _ => match &title {
                    Some(t) => format!("{t} at {} (details require sign-in)", query.company.trim()),
                    None => continue,
                },
            };
            postings.push(JobPosting::new(SourceId::LinkedIn, url, title, text));
        }
        Ok(postings)
    }

    fn id(&self) -> SourceId {
        SourceId::LinkedIn
    }
}
