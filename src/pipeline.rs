// src/pipeline.rs
//! Single-search pipeline: coordinator → consolidation. The error surface
//! keeps "bad query", "nothing to work from" and "AI failed" apart — they
//! call for different user actions.

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::ai::AiConfig;
use crate::consolidate::{ConsolidateError, ConsolidationEngine, EnhancedJobDescription};
use crate::search::types::{QueryError, SearchOutcome, SearchQuery, SourceId};
use crate::search::{SearchConfig, SearchCoordinator};

/// A completed run: the search evidence plus the consolidated artifact.
#[derive(Debug, Clone)]
pub struct ConsolidatedReport {
    pub outcome: SearchOutcome,
    pub description: EnhancedJobDescription,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    InvalidQuery(#[from] QueryError),
    /// No postings retrieved and no user description to fall back on. The
    /// outcome is attached so callers can tell "nowhere listed" from
    /// "the portals refused us".
    #[error("no postings found and no user description given")]
    InsufficientInput { outcome: SearchOutcome },
    #[error("consolidation failed: {source}")]
    Consolidation {
        outcome: SearchOutcome,
        #[source]
        source: ConsolidateError,
    },
}

impl PipelineError {
    /// The search evidence, when the run got that far.
    pub fn outcome(&self) -> Option<&SearchOutcome> {
        match self {
            PipelineError::InvalidQuery(_) => None,
            PipelineError::InsufficientInput { outcome }
            | PipelineError::Consolidation { outcome, .. } => Some(outcome),
        }
    }

    /// Portals that answered with an anti-automation block.
    pub fn blocked_sources(&self) -> Vec<SourceId> {
        self.outcome()
            .map(SearchOutcome::blocked_sources)
            .unwrap_or_default()
    }
}

pub struct SearchPipeline {
    coordinator: SearchCoordinator,
    engine: ConsolidationEngine,
}

impl SearchPipeline {
    pub fn new(coordinator: SearchCoordinator, engine: ConsolidationEngine) -> Self {
        Self {
            coordinator,
            engine,
        }
    }

    /// Production wiring: the default portal line-up and the OpenAI backend.
    pub fn with_defaults(ai: &AiConfig) -> Self {
        Self::new(
            SearchCoordinator::with_default_sources(SearchConfig::default()),
            ConsolidationEngine::openai(ai),
        )
    }

    pub async fn run(&self, query: &SearchQuery) -> Result<ConsolidatedReport, PipelineError> {
        self.run_with_cancel(query, &CancellationToken::new()).await
    }

    pub async fn run_with_cancel(
        &self,
        query: &SearchQuery,
        cancel: &CancellationToken,
    ) -> Result<ConsolidatedReport, PipelineError> {
        let outcome = self.coordinator.search_with_cancel(query, cancel).await?;
        match self.engine.consolidate(query, &outcome.postings).await {
            Ok(description) => Ok(ConsolidatedReport {
                outcome,
                description,
            }),
            Err(ConsolidateError::InsufficientInput) => {
                Err(PipelineError::InsufficientInput { outcome })
            }
            Err(source) => Err(PipelineError::Consolidation { outcome, source }),
        }
    }
}
