// tests/consolidate_shape.rs
// The six-field shape invariant: every successful consolidation populates
// all sections, and an input with nothing to work from never reaches the
// backend.

use std::sync::Arc;

use job_posting_aggregator::consolidate::{
    ConsolidateConfig, ConsolidateError, ConsolidationEngine, ScriptedBackend, NOT_SPECIFIED,
};
use job_posting_aggregator::search::types::{JobPosting, SearchQuery, SourceId};

const GOOD_REPLY: &str = r#"{
  "overview": "Leads the data platform team.",
  "responsibilities": ["Own ingestion pipelines", "Mentor engineers"],
  "required_qualifications": ["5+ years of data engineering"],
  "preferred_qualifications": [],
  "key_competencies": ["Ownership", "Communication"],
  "work_environment": "Hybrid, Singapore-based."
}"#;

fn engine(replies: Vec<&str>) -> (ConsolidationEngine, Arc<ScriptedBackend>) {
    let backend = Arc::new(ScriptedBackend::new(replies));
    let engine = ConsolidationEngine::new(backend.clone(), ConsolidateConfig::default());
    (engine, backend)
}

fn posting() -> JobPosting {
    JobPosting::new(
        SourceId::MyCareersFuture,
        "https://mcf/job/view/1",
        Some("Data Engineer".into()),
        "Design and run ingestion pipelines for the bank.",
    )
}

#[tokio::test]
async fn a_parsable_reply_populates_all_six_fields() {
    let (engine, backend) = engine(vec![GOOD_REPLY]);
    let query = SearchQuery::new("Acme", "Data Engineer");

    let d = engine.consolidate(&query, &[posting()]).await.unwrap();
    assert_eq!(backend.calls(), 1);
    assert!(!d.overview.is_empty());
    assert_eq!(d.responsibilities.len(), 2);
    assert!(!d.required_qualifications.is_empty());
    // Blank sections come back as the explicit placeholder, never absent.
    assert_eq!(d.preferred_qualifications, vec![NOT_SPECIFIED.to_string()]);
    assert!(!d.key_competencies.is_empty());
    assert!(!d.work_environment.is_empty());
}

#[tokio::test]
async fn a_user_description_alone_is_enough_input() {
    let (engine, backend) = engine(vec![GOOD_REPLY]);
    let query =
        SearchQuery::new("Acme", "Data Engineer").with_description("We wrangle data at scale.");

    let d = engine.consolidate(&query, &[]).await.unwrap();
    assert_eq!(backend.calls(), 1);
    assert!(!d.overview.is_empty());
}

#[tokio::test]
async fn no_input_at_all_short_circuits_without_a_backend_call() {
    let (engine, backend) = engine(vec![GOOD_REPLY]);
    let query = SearchQuery::new("Acme", "Data Engineer");

    let err = engine.consolidate(&query, &[]).await.unwrap_err();
    assert!(matches!(err, ConsolidateError::InsufficientInput));
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn a_blank_description_does_not_count_as_input() {
    let (engine, backend) = engine(vec![GOOD_REPLY]);
    let query = SearchQuery::new("Acme", "Data Engineer").with_description("   ");

    let err = engine.consolidate(&query, &[]).await.unwrap_err();
    assert!(matches!(err, ConsolidateError::InsufficientInput));
    assert_eq!(backend.calls(), 0);
}
