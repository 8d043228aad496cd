// src/search/types.rs
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identity of a configured job portal. Declaration order is source-priority
/// order: postings from earlier portals sort first in an outcome.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum SourceId {
    CareersGov,
    MyCareersFuture,
    LinkedIn,
}

impl SourceId {
    /// Stable display label, also used as the source tag in prompts and exports.
    pub fn label(&self) -> &'static str {
        match self {
            SourceId::CareersGov => "jobs.careers.gov.sg",
            SourceId::MyCareersFuture => "mycareersfuture.gov.sg",
            SourceId::LinkedIn => "linkedin.com",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One search request: company + title, with an optional description the
/// caller already has (fed to consolidation as extra context).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub company: String,
    pub title: String,
    pub user_description: Option<String>,
}

impl SearchQuery {
    pub fn new(company: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            company: company.into(),
            title: title.into(),
            user_description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.user_description = Some(description.into());
        self
    }

    /// The user-supplied description, if it carries any content.
    pub fn description(&self) -> Option<&str> {
        self.user_description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }

    /// Rejects blank company/title before anything touches the network.
    pub fn validate(&self) -> Result<(), QueryError> {
        if self.company.trim().is_empty() {
            return Err(QueryError::EmptyCompany);
        }
        if self.title.trim().is_empty() {
            return Err(QueryError::EmptyTitle);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("company name must not be empty")]
    EmptyCompany,
    #[error("job title must not be empty")]
    EmptyTitle,
}

/// One job listing as retrieved from a portal. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPosting {
    pub source: SourceId,
    pub url: String,
    pub raw_text: String,
    pub title: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

impl JobPosting {
    pub fn new(
        source: SourceId,
        url: impl Into<String>,
        title: Option<String>,
        raw_text: impl Into<String>,
    ) -> Self {
        Self {
            source,
            url: url.into(),
            raw_text: raw_text.into(),
            title,
            fetched_at: Utc::now(),
        }
    }
}

/// Failure classification for one portal fetch.
///
/// A valid-but-empty answer is not an error: adapters return `Ok(vec![])`
/// and the coordinator records it as [`SourceResult::Empty`].
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level trouble: DNS, connect, timeout, 5xx.
    #[error("portal unreachable: {0}")]
    Unreachable(String),
    /// The portal recognized us as automation and refused to answer.
    #[error("portal blocked the request: {0}")]
    Blocked(String),
    /// We got a response but could not make sense of its structure.
    #[error("response not understood: {0}")]
    ParseFailure(String),
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::Unreachable(_) => FetchErrorKind::Unreachable,
            FetchError::Blocked(_) => FetchErrorKind::Blocked,
            FetchError::ParseFailure(_) => FetchErrorKind::ParseFailure,
        }
    }

    /// Only transport trouble is worth retrying: a block gets worse when
    /// hammered, and a structural parse failure will not self-heal.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Unreachable(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchErrorKind {
    Unreachable,
    Blocked,
    ParseFailure,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FetchErrorKind::Unreachable => "unreachable",
            FetchErrorKind::Blocked => "blocked",
            FetchErrorKind::ParseFailure => "parse failure",
        };
        f.write_str(s)
    }
}

/// Per-source verdict inside a [`SearchOutcome`]. Partial failure is data,
/// not an exception crossing component boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SourceResult {
    Success(Vec<JobPosting>),
    Empty,
    Failed(FetchErrorKind),
}

impl SourceResult {
    pub fn is_blocked(&self) -> bool {
        matches!(self, SourceResult::Failed(FetchErrorKind::Blocked))
    }
}

/// A posting dropped by URL deduplication; kept so the losing source stays
/// visible in diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscardedDuplicate {
    pub source: SourceId,
    pub url: String,
}

/// Everything one coordinator run produced. `source_results` carries exactly
/// one entry per configured source, even when every source failed.
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub query: SearchQuery,
    /// Deduplicated, in source-priority order, stable by fetch order within a source.
    pub postings: Vec<JobPosting>,
    pub source_results: BTreeMap<SourceId, SourceResult>,
    pub discarded_duplicates: Vec<DiscardedDuplicate>,
}

impl SearchOutcome {
    /// Sources that answered with an anti-automation block, for user-facing
    /// "these portals refused us" reporting.
    pub fn blocked_sources(&self) -> Vec<SourceId> {
        self.source_results
            .iter()
            .filter(|(_, r)| r.is_blocked())
            .map(|(id, _)| *id)
            .collect()
    }
}

/// Capability every portal integration implements. Each adapter owns its own
/// query encoding and result extraction; nothing else about the portal leaks
/// into the coordinator.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    async fn fetch(&self, query: &SearchQuery) -> Result<Vec<JobPosting>, FetchError>;
    fn id(&self) -> SourceId;
}
