//! Live provider searches.
//!
//! Run with: cargo test --package scalescout-literature --test test_live_sources -- --ignored --nocapture

use scalescout_common::SandboxClient;
use scalescout_literature::search::MultiSourceSearcher;
use scalescout_literature::sources::{build_source, SourceSettings};
use scalescout_literature::PaperSource;

#[tokio::test]
#[ignore] // Requires network access
async fn test_each_provider_finds_robot_empathy_papers() {
    let client = SandboxClient::new().unwrap();
    let settings = SourceSettings::default();

    for kind in PaperSource::ALL {
        let source = build_source(kind, client.clone(), &settings);
        match source.search("robot empathy", 5).await {
            Ok(papers) => {
                println!("{kind}: {} papers", papers.len());
                for p in &papers {
                    println!("  {:?} {} (pdf: {})", p.year, p.title, p.pdf_url.is_some());
                }
            }
            Err(e) => println!("{kind}: error {e}"),
        }
    }
}

#[tokio::test]
#[ignore] // Requires network access
async fn test_provider_statuses() {
    let searcher = MultiSourceSearcher::from_settings(
        &[PaperSource::Arxiv, PaperSource::OpenAlex],
        &SandboxClient::new().unwrap(),
        &SourceSettings::default(),
        5,
    );
    for status in searcher.statuses().await {
        println!("{:<18} enabled={} healthy={} rpm={}",
            status.name, status.enabled, status.healthy, status.requests_per_minute);
    }
}
