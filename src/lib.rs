// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod batch;
pub mod config;
pub mod consolidate;
pub mod pipeline;
pub mod search;

// ---- Re-exports for stable public API ----
pub use crate::batch::{
    parse_batch_rows, render_report_tsv, BatchItem, BatchOrchestrator, BatchProgress,
    BatchReport, BatchStatus,
};
pub use crate::config::AiConfig;
pub use crate::consolidate::{
    ConsolidateError, ConsolidationEngine, EnhancedJobDescription, NOT_SPECIFIED,
};
pub use crate::pipeline::{ConsolidatedReport, PipelineError, SearchPipeline};
pub use crate::search::types::{
    JobPosting, QueryError, SearchOutcome, SearchQuery, SourceAdapter, SourceId, SourceResult,
};
pub use crate::search::{SearchConfig, SearchCoordinator};
