// src/batch.rs
//! Batch mode: run the pipeline over an ordered list of queries. One bad row
//! never takes down its siblings; progress is observable as items leave
//! `Pending`; cancellation leaves the unprocessed tail `Pending`.
//!
//! Also owns the spreadsheet-paste I/O: queries arrive as tab-separated rows
//! and the report renders back to the same shape.

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use crate::consolidate::EnhancedJobDescription;
use crate::pipeline::{PipelineError, SearchPipeline};
use crate::search::types::SearchQuery;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BatchStatus {
    Pending,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BatchErrorKind {
    InvalidQuery,
    InsufficientInput,
    ConsolidationFailed,
}

/// Flattened per-item failure, kept lightweight so the report stays
/// cloneable and serializable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchError {
    pub kind: BatchErrorKind,
    pub message: String,
}

impl From<&PipelineError> for BatchError {
    fn from(err: &PipelineError) -> Self {
        let kind = match err {
            PipelineError::InvalidQuery(_) => BatchErrorKind::InvalidQuery,
            PipelineError::InsufficientInput { .. } => BatchErrorKind::InsufficientInput,
            PipelineError::Consolidation { .. } => BatchErrorKind::ConsolidationFailed,
        };
        Self {
            kind,
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchItem {
    pub query: SearchQuery,
    pub status: BatchStatus,
    pub result: Option<EnhancedJobDescription>,
    pub error: Option<BatchError>,
    /// Deduplicated postings that backed the consolidation.
    pub sources_found: usize,
}

impl BatchItem {
    fn pending(query: SearchQuery) -> Self {
        Self {
            query,
            status: BatchStatus::Pending,
            result: None,
            error: None,
            sources_found: 0,
        }
    }
}

/// One entry per input row, input order preserved.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub items: Vec<BatchItem>,
}

impl BatchReport {
    pub fn statuses(&self) -> Vec<BatchStatus> {
        self.items.iter().map(|i| i.status).collect()
    }
}

/// Fire-and-forget progress event: `index` is the item's position in the
/// input, emitted once when the item leaves `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    pub index: usize,
    pub status: BatchStatus,
}

pub struct BatchOrchestrator {
    pipeline: SearchPipeline,
}

impl BatchOrchestrator {
    pub fn new(pipeline: SearchPipeline) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self, queries: Vec<SearchQuery>) -> BatchReport {
        self.run_with(queries, None, &CancellationToken::new())
            .await
    }

    /// Items run in input order. Retries live inside the pipeline; a failed
    /// item stays `Failed` here. Progress sends never block and a dropped
    /// receiver is ignored.
    pub async fn run_with(
        &self,
        queries: Vec<SearchQuery>,
        progress: Option<UnboundedSender<BatchProgress>>,
        cancel: &CancellationToken,
    ) -> BatchReport {
        let mut items: Vec<BatchItem> = queries.into_iter().map(BatchItem::pending).collect();

        for (index, item) in items.iter_mut().enumerate() {
            if cancel.is_cancelled() {
                tracing::info!(index, "batch cancelled, leaving remaining items pending");
                break;
            }

            match self.pipeline.run_with_cancel(&item.query, cancel).await {
                Ok(report) => {
                    item.status = BatchStatus::Succeeded;
                    item.sources_found = report.outcome.postings.len();
                    item.result = Some(report.description);
                }
                Err(err) => {
                    tracing::warn!(
                        index,
                        company = %item.query.company,
                        error = %err,
                        "batch item failed"
                    );
                    item.status = BatchStatus::Failed;
                    item.sources_found = err
                        .outcome()
                        .map(|o| o.postings.len())
                        .unwrap_or_default();
                    item.error = Some(BatchError::from(&err));
                }
            }

            if let Some(tx) = &progress {
                let _ = tx.send(BatchProgress {
                    index,
                    status: item.status,
                });
            }
        }

        BatchReport { items }
    }
}

/// Parse rows pasted from a spreadsheet: a header line, then
/// `Company<TAB>Title<TAB>Description` rows. Rows missing company or title
/// are skipped, matching how a ragged paste behaves.
pub fn parse_batch_rows(text: &str) -> Vec<SearchQuery> {
    let mut lines = text.trim().lines();
    let Some(header) = lines.next() else {
        return Vec::new();
    };
    if header.split('\t').count() < 2 {
        return Vec::new();
    }

    let mut queries = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let mut cols = line.split('\t');
        let company = cols.next().unwrap_or_default().trim();
        let title = cols.next().unwrap_or_default().trim();
        let description = cols.next().unwrap_or_default().trim();
        if company.is_empty() || title.is_empty() {
            continue;
        }
        let mut query = SearchQuery::new(company, title);
        if !description.is_empty() {
            query = query.with_description(description);
        }
        queries.push(query);
    }
    queries
}

/// Render a report back to tab-separated text, one row per input item, ready
/// to paste into a spreadsheet or save as a download.
pub fn render_report_tsv(report: &BatchReport) -> String {
    let mut out = String::from(
        "Company Name\tJob Title\tJob Description\tEnhanced Description\tSources Found\n",
    );
    for item in &report.items {
        let enhanced = match (&item.result, &item.error) {
            (Some(description), _) => flatten(&description.to_plain_text()),
            (None, Some(error)) => format!("Error: {}", flatten(&error.message)),
            (None, None) => String::new(),
        };
        out.push_str(&format!(
            "{}\t{}\t{}\t{}\t{}\n",
            item.query.company.trim(),
            item.query.title.trim(),
            item.query.user_description.as_deref().unwrap_or("").trim(),
            enhanced,
            item.sources_found
        ));
    }
    out
}

/// Cell content must not break the row/column grid.
fn flatten(text: &str) -> String {
    text.replace(['\n', '\t'], " ").trim().to_string()
}
