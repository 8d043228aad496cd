// tests/batch_isolation.rs
// One bad item never takes down its siblings, the report keeps input order,
// and progress events fire as items leave Pending.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use job_posting_aggregator::batch::{BatchErrorKind, BatchOrchestrator, BatchStatus};
use job_posting_aggregator::consolidate::{
    ConsolidateConfig, ConsolidationEngine, ScriptedBackend,
};
use job_posting_aggregator::pipeline::SearchPipeline;
use job_posting_aggregator::search::types::{
    FetchError, JobPosting, SearchQuery, SourceAdapter, SourceId,
};
use job_posting_aggregator::search::{SearchConfig, SearchCoordinator};

const GOOD_REPLY: &str = r#"{
  "overview": "Does the job.",
  "responsibilities": ["Work"],
  "required_qualifications": ["Skill"],
  "preferred_qualifications": ["More skill"],
  "key_competencies": ["Grit"],
  "work_environment": "Office."
}"#;

const BAD_REPLY: &str = "no json here";

struct OnePostingAdapter;

#[async_trait]
impl SourceAdapter for OnePostingAdapter {
    async fn fetch(&self, query: &SearchQuery) -> Result<Vec<JobPosting>, FetchError> {
        Ok(vec![JobPosting::new(
            SourceId::MyCareersFuture,
            format!("https://mcf/job/view/{}", query.company.to_lowercase()),
            Some(query.title.clone()),
            format!("{} at {}", query.title, query.company),
        )])
    }

    fn id(&self) -> SourceId {
        SourceId::MyCareersFuture
    }
}

fn orchestrator(replies: Vec<&str>) -> BatchOrchestrator {
    let coordinator = SearchCoordinator::new(
        vec![Arc::new(OnePostingAdapter) as Arc<dyn SourceAdapter>],
        SearchConfig {
            fanout_width: 1,
            retry_limit: 0,
            call_timeout: Duration::from_secs(5),
            source_spacing: Duration::ZERO,
        },
    );
    let engine = ConsolidationEngine::new(
        Arc::new(ScriptedBackend::new(replies)),
        ConsolidateConfig::default(),
    );
    BatchOrchestrator::new(SearchPipeline::new(coordinator, engine))
}

fn queries() -> Vec<SearchQuery> {
    vec![
        SearchQuery::new("Alpha", "Engineer"),
        SearchQuery::new("Beta", "Engineer"),
        SearchQuery::new("Gamma", "Engineer"),
    ]
}

#[tokio::test]
async fn a_failing_middle_item_leaves_its_neighbors_alone() {
    // Item 2 burns its first reply and the strict retry, then fails.
    let orch = orchestrator(vec![GOOD_REPLY, BAD_REPLY, BAD_REPLY, GOOD_REPLY]);

    let report = orch.run(queries()).await;
    assert_eq!(
        report.statuses(),
        vec![
            BatchStatus::Succeeded,
            BatchStatus::Failed,
            BatchStatus::Succeeded
        ]
    );

    let failed = &report.items[1];
    assert_eq!(
        failed.error.as_ref().unwrap().kind,
        BatchErrorKind::ConsolidationFailed
    );
    assert!(failed.result.is_none());
    assert_eq!(failed.sources_found, 1); // postings were found, the AI step failed

    assert!(report.items[0].result.is_some());
    assert!(report.items[2].result.is_some());
}

#[tokio::test]
async fn an_invalid_row_is_isolated_too() {
    let orch = orchestrator(vec![GOOD_REPLY, GOOD_REPLY]);
    let rows = vec![
        SearchQuery::new("Alpha", "Engineer"),
        SearchQuery::new("", "Engineer"),
        SearchQuery::new("Gamma", "Engineer"),
    ];

    let report = orch.run(rows).await;
    assert_eq!(
        report.statuses(),
        vec![
            BatchStatus::Succeeded,
            BatchStatus::Failed,
            BatchStatus::Succeeded
        ]
    );
    assert_eq!(
        report.items[1].error.as_ref().unwrap().kind,
        BatchErrorKind::InvalidQuery
    );
    assert_eq!(report.items[1].sources_found, 0);
}

#[tokio::test]
async fn progress_events_fire_in_input_order() {
    let orch = orchestrator(vec![GOOD_REPLY, BAD_REPLY, BAD_REPLY, GOOD_REPLY]);
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    let report = orch
        .run_with(
            queries(),
            Some(tx),
            &tokio_util::sync::CancellationToken::new(),
        )
        .await;
    assert_eq!(report.items.len(), 3);

    let mut events = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        events.push((ev.index, ev.status));
    }
    assert_eq!(
        events,
        vec![
            (0, BatchStatus::Succeeded),
            (1, BatchStatus::Failed),
            (2, BatchStatus::Succeeded)
        ]
    );
}

#[tokio::test]
async fn a_dropped_progress_receiver_never_stalls_the_batch() {
    let orch = orchestrator(vec![GOOD_REPLY, GOOD_REPLY, GOOD_REPLY]);
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    drop(rx);

    let report = orch
        .run_with(
            queries(),
            Some(tx),
            &tokio_util::sync::CancellationToken::new(),
        )
        .await;
    assert_eq!(report.statuses(), vec![BatchStatus::Succeeded; 3]);
}
