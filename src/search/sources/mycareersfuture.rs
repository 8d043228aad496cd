// src/search/sources/mycareersfuture.rs
//! MyCareersFuture has a documented JSON search API, so this adapter
//! deserializes instead of scraping. Results are filtered to the queried
//! company and the posting view URL is rebuilt from the job UUID.

use serde::Deserialize;

use crate::search::sources::{
    classify_status, fetch_page_text, page_text, portal_client, transport_error,
};
use crate::search::types::{FetchError, JobPosting, SearchQuery, SourceAdapter, SourceId};

const API_URL: &str = "https://api.mycareersfuture.gov.sg/v2/search";
const PAGE_LIMIT: &str = "20";
const MAX_RESULTS: usize = 5;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<ApiJob>,
}

#[derive(Debug, Deserialize)]
struct ApiJob {
    #[serde(default)]
    uuid: String,
    title: Option<String>,
    company: Option<ApiCompany>,
    description: Option<String>,
    summary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiCompany {
    name: Option<String>,
}

/// A matched API result, before the (possible) detail fetch.
#[derive(Debug, PartialEq, Eq)]
struct ApiHit {
    url: String,
    title: Option<String>,
    text: String,
}

fn parse_api_results(body: &str, company: &str) -> Result<Vec<ApiHit>, FetchError> {
    let payload: SearchResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::ParseFailure(format!("search api json: {e}")))?;

    let needle = company.trim().to_lowercase();
    let mut hits = Vec::new();
    for job in payload.results {
        let employer = job
            .company
            .and_then(|c| c.name)
            .unwrap_or_default()
            .to_lowercase();
        if !employer.contains(&needle) {
            continue;
        }
        if job.uuid.is_empty() {
            continue;
        }
        // Descriptions arrive as HTML fragments.
        let text = page_text(job.description.or(job.summary).as_deref().unwrap_or(""));
        hits.push(ApiHit {
            url: format!("https://www.mycareersfuture.gov.sg/job/view/{}", job.uuid),
            title: job.title.filter(|t| !t.trim().is_empty()),
            text,
        });
        if hits.len() >= MAX_RESULTS {
            break;
        }
    }
    Ok(hits)
}

pub struct MyCareersFutureAdapter {
    http: reqwest::Client,
}

impl MyCareersFutureAdapter {
    pub fn new() -> Self {
        Self {
            http: portal_client(),
        }
    }
}

impl Default for MyCareersFutureAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SourceAdapter for MyCareersFutureAdapter {
    async fn fetch(&self, query: &SearchQuery) -> Result<Vec<JobPosting>, FetchError> {
        let search = format!("{} {}", query.title.trim(), query.company.trim());
        let resp = self
            .http
            .get(API_URL)
            .query(&[("search", search.as_str()), ("limit", PAGE_LIMIT)])
            .send()
            .await
            .map_err(transport_error)?;
        if let Some(err) = classify_status(resp.status()) {
            return Err(err);
        }
        let body = resp.text().await.map_err(transport_error)?;

        let mut postings = Vec::new();
        for hit in parse_api_results(&body, &query.company)? {
            let text = if hit.text.is_empty() {
                // The API sometimes omits the description; fall back to the
                // posting page itself.
                match fetch_page_text(&self.http, &hit.url).await {
                    Ok(t) => t,
                    Err(e) => {
                        tracing::debug!(source = %self.id(), url = %hit.url, error = %e, "detail fetch failed");
                        continue;
                    }
                }
            } else {
                hit.text
            };
            if text.is_empty() {
                continue;
            }
            postings.push(JobPosting::new(
                SourceId::MyCareersFuture,
                hit.url,
                hit.title,
                text,
            ));
        }
        Ok(postings)
    }

    fn id(&self) -> SourceId {
        SourceId::MyCareersFuture
    }
}
