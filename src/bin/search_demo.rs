//! Demo that runs one search-and-consolidate pipeline from the command line:
//! `search_demo "<company>" "<job title>" ["existing description"]`.

use job_posting_aggregator::{AiConfig, PipelineError, SearchPipeline, SearchQuery};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let mut args = std::env::args().skip(1);
    let company = args.next().unwrap_or_else(|| "Monetary Authority of Singapore".into());
    let title = args.next().unwrap_or_else(|| "Software Engineer".into());
    let mut query = SearchQuery::new(company, title);
    if let Some(desc) = args.next() {
        query = query.with_description(desc);
    }

    let pipeline = SearchPipeline::with_defaults(&AiConfig::from_env());
    match pipeline.run(&query).await {
        Ok(report) => {
            for (source, result) in &report.outcome.source_results {
                tracing::info!(%source, ?result, "source result");
            }
            println!("{}", report.description.to_plain_text());
        }
        Err(e @ PipelineError::InsufficientInput { .. }) => {
            let blocked = e.blocked_sources();
            if blocked.is_empty() {
                eprintln!("No postings found on any portal; supply a description to consolidate from.");
            } else {
                eprintln!(
                    "No usable postings; these portals blocked the search: {}",
                    blocked
                        .iter()
                        .map(|s| s.label())
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Pipeline failed: {e}");
            std::process::exit(1);
        }
    }
    Ok(())
}
