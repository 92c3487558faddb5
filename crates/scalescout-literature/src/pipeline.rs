//! End-to-end literature pipeline.
//!
//! Orchestrates one run:
//!   1. Generate search queries from the research context
//!   2. Search every enabled provider (rate limited, sequential)
//!   3. Deduplicate by title
//!   4. Screen for relevance
//!   5. Extract structured findings
//!   6. Download PDFs into category folders
//!   7. Organize findings into the taxonomy
//!
//! Every stage takes the previous stage's output and returns its own; the
//! orchestrator holds no run state between calls. Progress events go out on
//! a broadcast channel when one is attached.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use scalescout_common::ScoutError;
use scalescout_llm::LlmBackend;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::download::CategorizedDownloader;
use crate::extraction::extract_findings;
use crate::models::{PipelineResult, ResearchContext};
use crate::organize::organize_findings;
use crate::queries::generate_queries;
use crate::screening::{screen_papers, ScreeningConfig};
use crate::search::MultiSourceSearcher;

// ── Config ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub screen_limit: usize,
    pub extract_limit: usize,
    pub abstract_chars: usize,
    pub accept_threshold: u8,
    /// The first entry is the focus used when screening.
    pub focus_areas: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            screen_limit: 80,
            extract_limit: 50,
            abstract_chars: 500,
            accept_threshold: 3,
            focus_areas: vec![
                "definitions".to_string(),
                "behaviors".to_string(),
                "measurement".to_string(),
            ],
        }
    }
}

impl PipelineConfig {
    pub fn screening(&self) -> ScreeningConfig {
        ScreeningConfig {
            limit: self.screen_limit,
            abstract_chars: self.abstract_chars,
            threshold: self.accept_threshold,
            focus: self
                .focus_areas
                .first()
                .cloned()
                .unwrap_or_else(|| "definitions".to_string()),
        }
    }
}

/// Where one run's artifacts go. Known only to the orchestrator and its caller.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub run_dir: PathBuf,
}

impl RunContext {
    pub fn new(runs_dir: &Path, run_id: impl Into<String>) -> Self {
        let run_id = run_id.into();
        Self { run_dir: runs_dir.join(&run_id), run_id }
    }

    /// Run id from the current UTC time, e.g. `run_20240611_142530`.
    pub fn timestamped(runs_dir: &Path) -> Self {
        Self::new(runs_dir, format!("run_{}", Utc::now().format("%Y%m%d_%H%M%S")))
    }
}

// ── Progress events ───────────────────────────────────────────────────────────

/// Progress event emitted during a run (cloneable for broadcast).
#[derive(Debug, Clone, Serialize)]
pub struct PipelineProgress {
    pub job_id: Uuid,
    pub stage: String,
    pub message: String,
    pub papers_found: usize,
    pub papers_screened: usize,
    pub findings: usize,
    pub pdfs_downloaded: usize,
}

// ── Orchestrator ──────────────────────────────────────────────────────────────

pub struct Pipeline {
    llm: Arc<dyn LlmBackend>,
    searcher: MultiSourceSearcher,
    downloader: CategorizedDownloader,
    config: PipelineConfig,
    progress_tx: Option<broadcast::Sender<PipelineProgress>>,
}

impl Pipeline {
    pub fn new(
        llm: Arc<dyn LlmBackend>,
        searcher: MultiSourceSearcher,
        downloader: CategorizedDownloader,
        config: PipelineConfig,
    ) -> Self {
        Self { llm, searcher, downloader, config, progress_tx: None }
    }

    pub fn with_progress(mut self, tx: broadcast::Sender<PipelineProgress>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    pub fn searcher(&self) -> &MultiSourceSearcher {
        &self.searcher
    }

    /// Run every stage in order.
    ///
    /// Only setup problems are errors: an unusable context or a run
    /// directory that cannot be created. Everything after that degrades to
    /// empty results and is reported in `PipelineResult::errors`.
    #[instrument(skip(self, ctx), fields(run_id = %run.run_id))]
    pub async fn run(
        &self,
        ctx: &ResearchContext,
        run: &RunContext,
    ) -> Result<PipelineResult, ScoutError> {
        ctx.validate()?;
        tokio::fs::create_dir_all(&run.run_dir).await.map_err(|e| {
            ScoutError::Storage(format!("cannot create run directory {}: {e}", run.run_dir.display()))
        })?;

        let job_id = Uuid::new_v4();
        let t0 = Instant::now();
        let mut progress = PipelineProgress {
            job_id,
            stage: String::new(),
            message: String::new(),
            papers_found: 0,
            papers_screened: 0,
            findings: 0,
            pdfs_downloaded: 0,
        };
        info!(job_id = %job_id, run_dir = %run.run_dir.display(), "Starting literature pipeline");

        // ── 1. Queries ────────────────────────────────────────────────────────
        info!("Stage 1/6: generating search queries");
        let queries = generate_queries(self.llm.as_ref(), ctx).await;
        for (i, q) in queries.iter().enumerate() {
            info!(query = %q, "Query {}", i + 1);
        }
        self.emit(&mut progress, "queries", format!("{} queries generated", queries.len()));

        // ── 2. Search + dedup ─────────────────────────────────────────────────
        info!(sources = ?self.searcher.enabled(), "Stage 2/6: searching literature");
        let search = self.searcher.search_all(&queries).await;
        let mut errors = search.errors;
        progress.papers_found = search.papers.len();
        self.emit(
            &mut progress,
            "search",
            format!("{} unique papers ({} raw)", search.papers.len(), search.raw_count),
        );
        let total_papers_found = search.papers.len();

        // ── 3. Screening ──────────────────────────────────────────────────────
        info!("Stage 3/6: screening for relevance");
        let screened = screen_papers(self.llm.as_ref(), search.papers, &self.config.screening()).await;
        progress.papers_screened = screened.len();
        self.emit(&mut progress, "screening", format!("{} papers accepted", screened.len()));

        // ── 4. Extraction ─────────────────────────────────────────────────────
        info!("Stage 4/6: extracting findings");
        let findings = extract_findings(self.llm.as_ref(), &screened, self.config.extract_limit).await;
        progress.findings = findings.len();
        self.emit(&mut progress, "extraction", format!("{} findings extracted", findings.len()));

        // ── 5. Downloads ──────────────────────────────────────────────────────
        info!("Stage 5/6: downloading PDFs");
        let report = self.downloader.download_all(&screened, &run.run_dir).await;
        progress.pdfs_downloaded = report.downloaded_count();
        self.emit(
            &mut progress,
            "download",
            format!("{}/{} PDFs downloaded", report.downloaded_count(), report.attempted.len()),
        );
        errors.extend(report.errors.iter().cloned());

        // ── 6. Organization ───────────────────────────────────────────────────
        info!("Stage 6/6: organizing findings");
        let organized = organize_findings(&findings);
        self.emit(&mut progress, "complete", "Pipeline complete".to_string());

        let result = PipelineResult {
            job_id,
            run_id: run.run_id.clone(),
            search_queries: queries,
            raw_papers_found: search.raw_count,
            total_papers_found,
            screened_papers: screened.len(),
            extracted_findings: findings.len(),
            downloads_attempted: report.attempted.len(),
            pdfs_downloaded: report.downloaded_count(),
            per_category: report.per_category.clone(),
            organized_findings: organized,
            downloaded_papers: report.downloaded(),
            all_findings: findings,
            errors,
            duration_ms: t0.elapsed().as_millis() as u64,
        };

        info!(
            papers = result.total_papers_found,
            screened = result.screened_papers,
            findings = result.extracted_findings,
            pdfs = result.pdfs_downloaded,
            errors = result.errors.len(),
            duration_ms = result.duration_ms,
            "Pipeline complete"
        );
        Ok(result)
    }

    fn emit(&self, progress: &mut PipelineProgress, stage: &str, message: String) {
        progress.stage = stage.to_string();
        progress.message = message;
        if let Some(ref tx) = self.progress_tx {
            let _ = tx.send(progress.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screening_config_uses_first_focus_area() {
        let cfg = PipelineConfig {
            focus_areas: vec!["measurement".to_string()],
            ..Default::default()
        };
        let s = cfg.screening();
        assert_eq!(s.focus, "measurement");
        assert_eq!(s.limit, 80);

        let empty = PipelineConfig { focus_areas: vec![], ..Default::default() };
        assert_eq!(empty.screening().focus, "definitions");
    }

    #[test]
    fn test_run_context_paths() {
        let run = RunContext::new(Path::new("/tmp/runs"), "run_1");
        assert_eq!(run.run_dir, PathBuf::from("/tmp/runs/run_1"));
        assert!(RunContext::timestamped(Path::new("x")).run_id.starts_with("run_"));
    }
}
