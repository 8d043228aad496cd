// src/search/mod.rs
pub mod pacing;
pub mod sources;
pub mod types;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use reqwest::Url;
use tokio_util::sync::CancellationToken;

use crate::search::pacing::SourcePacer;
use crate::search::sources::{
    careers_gov::CareersGovAdapter, linkedin::LinkedInAdapter,
    mycareersfuture::MyCareersFutureAdapter,
};
use crate::search::types::{
    DiscardedDuplicate, FetchError, FetchErrorKind, JobPosting, QueryError, SearchOutcome,
    SearchQuery, SourceAdapter, SourceId, SourceResult,
};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("search_runs_total", "Coordinator runs started.");
        describe_counter!("search_postings_total", "Postings kept after dedup.");
        describe_counter!(
            "search_source_errors_total",
            "Adapter attempts that ended in a fetch error."
        );
        describe_counter!(
            "search_dedup_total",
            "Postings dropped by URL deduplication."
        );
    });
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// How many adapters may be in flight at once.
    pub fanout_width: usize,
    /// Extra attempts after the first, `Unreachable` only.
    pub retry_limit: u32,
    /// Hard cap per adapter call; elapsing maps to `Failed(Unreachable)`.
    pub call_timeout: Duration,
    /// Minimum spacing between requests to the same portal.
    pub source_spacing: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            fanout_width: 2,
            retry_limit: 1,
            call_timeout: Duration::from_secs(10),
            source_spacing: Duration::from_secs(1),
        }
    }
}

/// Fans one query out to every configured adapter and folds the answers into
/// a single [`SearchOutcome`]. Adapter order is priority order.
pub struct SearchCoordinator {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    pacer: SourcePacer,
    cfg: SearchConfig,
}

impl SearchCoordinator {
    pub fn new(adapters: Vec<Arc<dyn SourceAdapter>>, cfg: SearchConfig) -> Self {
        let pacer = SourcePacer::new(cfg.source_spacing);
        Self {
            adapters,
            pacer,
            cfg,
        }
    }

    /// The production line-up: government board first, API portal second,
    /// LinkedIn last.
    pub fn with_default_sources(cfg: SearchConfig) -> Self {
        Self::new(
            vec![
                Arc::new(CareersGovAdapter::new()),
                Arc::new(MyCareersFutureAdapter::new()),
                Arc::new(LinkedInAdapter::new()),
            ],
            cfg,
        )
    }

    pub async fn search(&self, query: &SearchQuery) -> Result<SearchOutcome, QueryError> {
        self.search_with_cancel(query, &CancellationToken::new())
            .await
    }

    /// Like [`search`](Self::search), but stops dispatching adapters once
    /// `cancel` fires; in-flight calls finish or time out naturally. Skipped
    /// sources are recorded as `Failed(Unreachable)` so the one-entry-per-
    /// source invariant holds.
    pub async fn search_with_cancel(
        &self,
        query: &SearchQuery,
        cancel: &CancellationToken,
    ) -> Result<SearchOutcome, QueryError> {
        query.validate()?;
        ensure_metrics_described();
        counter!("search_runs_total").increment(1);

        let width = self.cfg.fanout_width.max(1);
        // `buffered` yields in input order, which is exactly the configured
        // source-priority order.
        let results: Vec<(SourceId, SourceResult)> = stream::iter(self.adapters.iter())
            .map(|adapter| async move {
                (
                    adapter.id(),
                    self.fetch_source(adapter.as_ref(), query, cancel).await,
                )
            })
            .buffered(width)
            .collect()
            .await;

        let mut ordered = Vec::new();
        let mut source_results = BTreeMap::new();
        for (id, result) in results {
            if let SourceResult::Success(postings) = &result {
                ordered.extend(postings.iter().cloned());
            }
            source_results.insert(id, result);
        }

        let (postings, discarded_duplicates) = dedup_postings(ordered);
        counter!("search_postings_total").increment(postings.len() as u64);
        counter!("search_dedup_total").increment(discarded_duplicates.len() as u64);
        tracing::info!(
            company = %query.company,
            title = %query.title,
            postings = postings.len(),
            duplicates = discarded_duplicates.len(),
            "search complete"
        );

        Ok(SearchOutcome {
            query: query.clone(),
            postings,
            source_results,
            discarded_duplicates,
        })
    }

    async fn fetch_source(
        &self,
        adapter: &dyn SourceAdapter,
        query: &SearchQuery,
        cancel: &CancellationToken,
    ) -> SourceResult {
        let source = adapter.id();
        let mut attempts_left = self.cfg.retry_limit + 1;
        loop {
            if cancel.is_cancelled() {
                tracing::debug!(%source, "dispatch suppressed, search cancelled");
                return SourceResult::Failed(FetchErrorKind::Unreachable);
            }
            self.pacer.wait_turn(source).await;
            attempts_left -= 1;

            let err = match tokio::time::timeout(self.cfg.call_timeout, adapter.fetch(query)).await
            {
                Ok(Ok(postings)) if postings.is_empty() => return SourceResult::Empty,
                Ok(Ok(postings)) => return SourceResult::Success(postings),
                Ok(Err(e)) => e,
                Err(_) => FetchError::Unreachable(format!(
                    "no answer within {:?}",
                    self.cfg.call_timeout
                )),
            };

            counter!("search_source_errors_total").increment(1);
            tracing::warn!(%source, error = %err, attempts_left, "source fetch failed");
            if err.is_retryable() && attempts_left > 0 {
                continue;
            }
            return SourceResult::Failed(err.kind());
        }
    }
}

/// Key two URLs to the same posting: host+path lowercased, scheme and
/// fragment dropped, trailing slashes trimmed, query string preserved.
fn normalize_url_key(raw: &str) -> String {
    let raw = raw.trim();
    match Url::parse(raw) {
        Ok(url) => {
            let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
            let path = url.path().trim_end_matches('/').to_ascii_lowercase();
            match url.query() {
                Some(q) => format!("{host}{path}?{}", q.to_ascii_lowercase()),
                None => format!("{host}{path}"),
            }
        }
        Err(_) => raw.trim_end_matches('/').to_ascii_lowercase(),
    }
}

/// Collapse postings sharing a normalized URL. Longer raw text wins the slot
/// (richer content); the loser is recorded, not silently dropped.
fn dedup_postings(ordered: Vec<JobPosting>) -> (Vec<JobPosting>, Vec<DiscardedDuplicate>) {
    let mut slot_by_key: HashMap<String, usize> = HashMap::new();
    let mut kept: Vec<JobPosting> = Vec::with_capacity(ordered.len());
    let mut discarded = Vec::new();

    for posting in ordered {
        let key = normalize_url_key(&posting.url);
        match slot_by_key.get(&key) {
            None => {
                slot_by_key.insert(key, kept.len());
                kept.push(posting);
            }
            Some(&slot) => {
                let loser = if posting.raw_text.len() > kept[slot].raw_text.len() {
                    std::mem::replace(&mut kept[slot], posting)
                } else {
                    posting
                };
                discarded.push(DiscardedDuplicate {
                    source: loser.source,
                    url: loser.url,
                });
            }
        }
    }
    (kept, discarded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_keys_ignore_scheme_case_and_trailing_slash() {
        assert_eq!(
            normalize_url_key("http://X.com/Job/1/"),
            normalize_url_key("https://x.com/job/1")
        );
    }

    #[test]
    fn url_keys_keep_query_and_drop_fragment() {
        assert_ne!(
            normalize_url_key("https://x.com/job?id=1"),
            normalize_url_key("https://x.com/job?id=2")
        );
        assert_eq!(
            normalize_url_key("https://x.com/job/1#apply"),
            normalize_url_key("https://x.com/job/1")
        );
    }

    #[test]
    fn unparsable_urls_fall_back_to_string_keys() {
        assert_eq!(normalize_url_key("Not A Url/"), "not a url");
    }

    #[test]
    fn dedup_keeps_longer_text_and_records_loser() {
        let short = JobPosting::new(SourceId::CareersGov, "http://x.com/job/1", None, "x".repeat(50));
        let long =
            JobPosting::new(SourceId::LinkedIn, "http://x.com/job/1/", None, "y".repeat(500));
        let (kept, discarded) = dedup_postings(vec![short, long]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].raw_text.len(), 500);
        assert_eq!(kept[0].source, SourceId::LinkedIn);
        assert_eq!(discarded.len(), 1);
        assert_eq!(discarded[0].source, SourceId::CareersGov);
    }

    #[test]
    fn dedup_is_stable_for_distinct_urls() {
        let a = JobPosting::new(SourceId::CareersGov, "https://a.example/1", None, "a");
        let b = JobPosting::new(SourceId::MyCareersFuture, "https://b.example/2", None, "b");
        let (kept, discarded) = dedup_postings(vec![a.clone(), b.clone()]);
        assert_eq!(kept, vec![a, b]);
        assert!(discarded.is_empty());
    }
}
