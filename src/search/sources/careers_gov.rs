// src/search/sources/careers_gov.rs
//! Singapore government job board. The search page is server-rendered HTML;
//! posting links all live under `/jobs/hrp/`, and the full text comes from
//! fetching each posting page.

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::search::sources::{
    classify_status, fetch_page_text, page_text, portal_client, transport_error,
};
use crate::search::types::{FetchError, JobPosting, SearchQuery, SourceAdapter, SourceId};

const SEARCH_URL: &str = "https://jobs.careers.gov.sg/jobs/search";
const MAX_RESULTS: usize = 5;

pub struct CareersGovAdapter {
    http: reqwest::Client,
}

impl CareersGovAdapter {
    pub fn new() -> Self {
        Self {
            http: portal_client(),
        }
    }

    /// Pull posting links out of a search result page. Returns
    /// (absolute url, card title) pairs in page order, capped.
    fn extract_posting_links(body: &str) -> Vec<(String, Option<String>)> {
        static RE_LINK: OnceCell<Regex> = OnceCell::new();
        let re_link = RE_LINK.get_or_init(|| {
            Regex::new(r#"(?is)<a[^>]+href="([^"]*/jobs/hrp/[^"]+)"[^>]*>(.*?)</a>"#).unwrap()
        });

        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for caps in re_link.captures_iter(body) {
            let href = caps[1].trim().to_string();
            let url = if href.starts_with("http") {
                href
            } else {
                format!("https://jobs.careers.gov.sg{href}")
            };
            if !seen.insert(url.clone()) {
                continue;
            }
            let title = Some(page_text(&caps[2])).filter(|t| !t.is_empty());
            out.push((url, title));
            if out.len() >= MAX_RESULTS {
                break;
            }
        }
        out
    }
}

impl Default for CareersGovAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SourceAdapter for CareersGovAdapter {
    async fn fetch(&self, query: &SearchQuery) -> Result<Vec<JobPosting>, FetchError> {
        let search = format!("{} {}", query.company.trim(), query.title.trim());
        let resp = self
            .http
            .get(SEARCH_URL)
            .query(&[("query", search.as_str())])
            .send()
            .await
            .map_err(transport_error)?;
        if let Some(err) = classify_status(resp.status()) {
            return Err(err);
        }
        let body = resp.text().await.map_err(transport_error)?;

        let links = Self::extract_posting_links(&body);
        if links.is_empty() {
            // An empty result list on a real page is a valid answer; a page
            // that is not HTML at all means the layout moved under us.
            if !body.to_ascii_lowercase().contains("<html") {
                return Err(FetchError::ParseFailure(
                    "search response is not an HTML page".into(),
                ));
            }
            return Ok(Vec::new());
        }

        let mut postings = Vec::with_capacity(links.len());
        for (url, title) in links {
            match fetch_page_text(&self.http, &url).await {
                Ok(text) if !text.is_empty() => {
                    postings.push(JobPosting::new(SourceId::CareersGov, url, title, text));
                }
                Ok(_) => {
                    tracing::debug!(source = %self.id(), url = %url, "posting page had no text");
                }
                Err(e) => {
                    // One dead posting page does not fail the portal.
                    tracing::debug!(source = %self.id(), url = %url, error = %e, "posting fetch failed");
                }
            }
        }
        Ok(postings)
    }

    fn id(&self) -> SourceId {
        SourceId::CareersGov
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_PAGE: &str = r#"<html><body>
        <div class="results">
          <a href="/jobs/hrp/16586910/005056a3-d347-1fe0-b1fc-24d371e80282">
            <span>Senior  Policy Analyst</span>
          </a>
          <a href="/jobs/hrp/16586910/005056a3-d347-1fe0-b1fc-24d371e80282">dup card</a>
          <a href="https://jobs.careers.gov.sg/jobs/hrp/123/abc">Data Engineer</a>
          <a href="/about">About us</a>
        </div></body></html>"#;

    #[test]
    fn extracts_posting_links_with_titles() {
        let links = CareersGovAdapter::extract_posting_links(SEARCH_PAGE);
        assert_eq!(links.len(), 2);
        assert_eq!(
            links[0].0,
            "https://jobs.careers.gov.sg/jobs/hrp/16586910/005056a3-d347-1fe0-b1fc-24d371e80282"
        );
        assert_eq!(links[0].1.as_deref(), Some("Senior Policy Analyst"));
        assert_eq!(links[1].0, "https://jobs.careers.gov.sg/jobs/hrp/123/abc");
    }

    #[test]
    fn non_posting_links_are_ignored() {
        let links = CareersGovAdapter::extract_posting_links("<html><a href=\"/faq\">FAQ</a></html>");
        assert!(links.is_empty());
    }
}
