// src/consolidate/mod.rs
pub mod backend;
pub mod description;

use std::sync::Arc;

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use thiserror::Error;

use crate::config::ai::AiConfig;
use crate::search::types::{JobPosting, SearchQuery};

pub use backend::{BackendError, CompletionBackend, OpenAiBackend, ScriptedBackend};
pub use description::{export_file_name, EnhancedJobDescription, NOT_SPECIFIED, SECTION_LABELS};

use description::parse_description;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "consolidation_requests_total",
            "Completion calls sent to the backend."
        );
        describe_counter!(
            "consolidation_retries_total",
            "Strict-format retries after an unparsable reply."
        );
        describe_counter!(
            "consolidation_failures_total",
            "Consolidations that failed after retry."
        );
    });
}

#[derive(Debug, Error)]
pub enum ConsolidateError {
    /// Nothing to work from: no postings and no user-supplied description.
    /// Raised before any backend call.
    #[error("no postings and no user description to consolidate")]
    InsufficientInput,
    #[error(transparent)]
    Backend(#[from] BackendError),
    /// The backend answered twice and neither reply matched the six-section
    /// shape.
    #[error("backend reply unusable after strict retry: {0}")]
    ConsolidationFailed(String),
}

#[derive(Debug, Clone)]
pub struct ConsolidateConfig {
    /// Per-posting character cap fed into the prompt.
    pub max_posting_chars: usize,
    /// Total character budget across all postings; longest/most recent win
    /// when over budget.
    pub max_total_chars: usize,
}

impl Default for ConsolidateConfig {
    fn default() -> Self {
        Self {
            max_posting_chars: 4_000,
            max_total_chars: 24_000,
        }
    }
}

const SYSTEM_PROMPT: &str = "You are an expert HR professional who specializes in creating \
comprehensive job descriptions. You excel at extracting key information from multiple sources \
and consolidating it into clear, professional job descriptions. Respond with a single JSON \
object and nothing else.";

const FORMAT_INSTRUCTION: &str = r#"Respond with a single JSON object with exactly these keys:
"overview" (string), "responsibilities" (array of strings), "required_qualifications" (array of strings), "preferred_qualifications" (array of strings), "key_competencies" (array of strings), "work_environment" (string).
Write "Not specified" for anything the sources do not state."#;

const STRICT_RETRY_NOTE: &str = "IMPORTANT: your previous reply could not be parsed. Output \
ONLY the JSON object, with all six keys present. No prose, no code fences.";

/// Merges the collected postings (plus the optional user description) into
/// one [`EnhancedJobDescription`] via a chat-completion backend.
pub struct ConsolidationEngine {
    backend: Arc<dyn CompletionBackend>,
    cfg: ConsolidateConfig,
}

impl ConsolidationEngine {
    pub fn new(backend: Arc<dyn CompletionBackend>, cfg: ConsolidateConfig) -> Self {
        Self { backend, cfg }
    }

    /// Production wiring: OpenAI backend from config, default budgets.
    pub fn openai(ai: &AiConfig) -> Self {
        Self::new(Arc::new(OpenAiBackend::new(ai)), ConsolidateConfig::default())
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// One backend call, or two when the first reply does not parse. The
    /// output shape is invariant even though the wording is generative.
    pub async fn consolidate(
        &self,
        query: &SearchQuery,
        postings: &[JobPosting],
    ) -> Result<EnhancedJobDescription, ConsolidateError> {
        ensure_metrics_described();

        let user_description = query.description();
        if postings.is_empty() && user_description.is_none() {
            return Err(ConsolidateError::InsufficientInput);
        }

        let selected = select_postings(postings, &self.cfg);
        if selected.len() < postings.len() {
            tracing::info!(
                dropped = postings.len() - selected.len(),
                budget = self.cfg.max_total_chars,
                "postings dropped to fit the consolidation budget"
            );
        }
        let prompt = build_prompt(query, &selected, user_description);

        counter!("consolidation_requests_total").increment(1);
        let first = self.backend.complete(SYSTEM_PROMPT, &prompt).await?;
        let first_err = match parse_description(&first) {
            Ok(d) => return Ok(d),
            Err(e) => e,
        };

        tracing::warn!(error = %first_err, backend = self.backend.name(), "reply unparsable, retrying strict");
        counter!("consolidation_retries_total").increment(1);
        counter!("consolidation_requests_total").increment(1);
        let strict = format!("{prompt}\n\n{STRICT_RETRY_NOTE}");
        let second = self.backend.complete(SYSTEM_PROMPT, &strict).await?;
        parse_description(&second).map_err(|e| {
            counter!("consolidation_failures_total").increment(1);
            ConsolidateError::ConsolidationFailed(e.to_string())
        })
    }
}

/// Cap each posting at the per-posting budget, then fit the set into the
/// total budget. Over budget, postings are ranked longest-first (ties to the
/// most recent fetch) and losers are dropped whole; survivors keep their
/// source-priority order.
fn select_postings<'a>(
    postings: &'a [JobPosting],
    cfg: &ConsolidateConfig,
) -> Vec<(&'a JobPosting, String)> {
    let truncated: Vec<String> = postings
        .iter()
        .map(|p| truncate_chars(&p.raw_text, cfg.max_posting_chars))
        .collect();
    let costs: Vec<usize> = truncated.iter().map(|t| t.chars().count()).collect();

    if costs.iter().sum::<usize>() <= cfg.max_total_chars {
        return postings.iter().zip(truncated).collect();
    }

    let mut order: Vec<usize> = (0..postings.len()).collect();
    order.sort_by(|&a, &b| {
        costs[b]
            .cmp(&costs[a])
            .then(postings[b].fetched_at.cmp(&postings[a].fetched_at))
    });

    let mut budget = cfg.max_total_chars;
    let mut keep = vec![false; postings.len()];
    for &i in &order {
        if costs[i] <= budget {
            keep[i] = true;
            budget -= costs[i];
        }
    }
    if !keep.iter().any(|&k| k) {
        // Degenerate budgets still get the best single posting, cut to fit.
        let best = order[0];
        return vec![(
            &postings[best],
            truncate_chars(&truncated[best], cfg.max_total_chars),
        )];
    }

    postings
        .iter()
        .zip(truncated)
        .enumerate()
        .filter(|(i, _)| keep[*i])
        .map(|(_, pair)| pair)
        .collect()
}

fn truncate_chars(s: &str, cap: usize) -> String {
    if s.chars().count() <= cap {
        s.to_string()
    } else {
        s.chars().take(cap).collect()
    }
}

fn build_prompt(
    query: &SearchQuery,
    selected: &[(&JobPosting, String)],
    user_description: Option<&str>,
) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Company: {}\nJob Title: {}\n\n",
        query.company.trim(),
        query.title.trim()
    ));
    if let Some(desc) = user_description {
        out.push_str(&format!("Existing Job Description:\n{desc}\n\n"));
    }

    if selected.is_empty() {
        out.push_str(&format!(
            "No job postings could be retrieved. Using your knowledge of the company \"{}\" \
             (its industry, mission, and typical organizational structure) and the job title \
             \"{}\" (typical responsibilities and requirements for this role), generate an \
             accurate, professional job description. Keep it realistic and specific.\n\n",
            query.company.trim(),
            query.title.trim()
        ));
    } else {
        out.push_str("Found Job Postings:\n\n");
        for (idx, (posting, text)) in selected.iter().enumerate() {
            out.push_str(&format!(
                "--- Source {}: {} ---\nURL: {}\n",
                idx + 1,
                posting.source.label(),
                posting.url
            ));
            if let Some(title) = &posting.title {
                out.push_str(&format!("Title: {title}\n"));
            }
            out.push_str(&format!("Content:\n{text}\n\n"));
        }
        out.push_str(
            "Analyze the postings above and consolidate them into one enhanced job \
             description. Extract from the sources rather than assuming; when sources \
             conflict, prioritize the official government portals (jobs.careers.gov.sg, \
             mycareersfuture.gov.sg) over other sources.\n\n",
        );
    }

    out.push_str(FORMAT_INSTRUCTION);
    out
}
