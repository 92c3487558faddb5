//! scalescout: literature discovery for robot-empathy scale design.
//! Entry point for the agent binary.
//!
//! Usage: `scalescout <context.json> [--check-sources]`

mod cli;
mod config;

use std::path::Path;

use anyhow::Context;
use clap::Parser;
use scalescout_literature::{
    write_summary, CategorizedDownloader, MultiSourceSearcher, Pipeline, PipelineProgress,
    ResearchContext, RunContext,
};
use scalescout_llm::BackendKind;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn read_context(path: &Path) -> anyhow::Result<ResearchContext> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading research context {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("parsing research context {}", path.display()))
}

/// Mirror progress events into the log until the sender goes away.
fn spawn_progress_logger(mut rx: broadcast::Receiver<PipelineProgress>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ev) => info!(
                    stage = %ev.stage,
                    found = ev.papers_found,
                    screened = ev.papers_screened,
                    findings = ev.findings,
                    pdfs = ev.pdfs_downloaded,
                    "{}", ev.message
                ),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "Progress logger lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("scalescout=debug,info")),
        )
        .init();

    info!("scalescout starting up");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = config::Config::load()?;
    info!(
        backend = config.llm.backend.as_str(),
        model = %config.llm.model,
        runs_dir = %config.output.runs_dir.display(),
        "Configuration loaded"
    );

    let ctx = read_context(&args.context)?;
    ctx.validate()?;

    // Text-understanding backend
    let backend_cfg = config.llm.backend_config();
    if backend_cfg.api_key.is_none() && config.llm.backend != BackendKind::Ollama {
        warn!(
            "No API key configured for {} (set llm.api_key or {})",
            config.llm.backend.as_str(),
            config.llm.api_key_env()
        );
    }
    let llm = scalescout_llm::build_backend(&backend_cfg)?;
    info!(model = llm.model_id(), local = llm.is_local(), "LLM backend ready");

    // Literature providers
    let enabled = config.sources.enabled_sources()?;
    let client = config.http.sandbox_client()?;
    let searcher = MultiSourceSearcher::from_settings(
        &enabled,
        &client,
        &config.sources.settings()?,
        config.sources.max_per_source,
    );
    info!(sources = ?searcher.enabled(), "Literature sources ready");

    if args.check_sources {
        for status in searcher.statuses().await {
            info!(
                source = %status.name,
                enabled = status.enabled,
                healthy = status.healthy,
                rpm = status.requests_per_minute,
                "Source status"
            );
        }
    }

    let downloader = CategorizedDownloader::new(config.pipeline.download_timeout())?
        .with_limit(config.pipeline.download_limit);

    let (tx, rx) = broadcast::channel(64);
    let progress_logger = spawn_progress_logger(rx);
    let pipeline = Pipeline::new(llm, searcher, downloader, config.pipeline.pipeline_config())
        .with_progress(tx);

    let run = RunContext::timestamped(&config.output.runs_dir);
    let outcome = pipeline.run(&ctx, &run).await;
    // Dropping the pipeline closes the channel so the logger drains and exits.
    drop(pipeline);
    if let Err(e) = progress_logger.await {
        warn!(error = %e, "Progress logger task failed");
    }
    let result = outcome?;
    let summary = write_summary(&run.run_dir, &result)?;

    info!(
        run_id = %result.run_id,
        papers = result.total_papers_found,
        screened = result.screened_papers,
        findings = result.extracted_findings,
        pdfs = result.pdfs_downloaded,
        errors = result.errors.len(),
        summary = %summary.display(),
        "Run finished"
    );
    for err in &result.errors {
        warn!(error = %err, "Recorded during run");
    }

    Ok(())
}
