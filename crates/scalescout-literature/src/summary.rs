//! Run summary persisted next to the downloaded PDFs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use scalescout_common::ScoutError;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{Category, CategoryTally, OrganizedResults, PipelineResult};

pub const SUMMARY_FILE: &str = "summary.json";
pub const FINDINGS_FILE: &str = "findings.json";

#[derive(Debug, Serialize)]
struct RunCounts {
    raw_papers_found: usize,
    total_papers_found: usize,
    screened_papers: usize,
    extracted_findings: usize,
    downloads_attempted: usize,
    pdfs_downloaded: usize,
}

#[derive(Debug, Serialize)]
struct DownloadedEntry<'a> {
    title: &'a str,
    authors: &'a [String],
    year: Option<i32>,
    source: String,
    category: Option<Category>,
    local_pdf_path: Option<&'a Path>,
    downloaded_at: Option<DateTime<Utc>>,
    doi: Option<&'a str>,
    relevance_score: Option<u8>,
}

#[derive(Debug, Serialize)]
struct RunSummary<'a> {
    job_id: Uuid,
    run_id: &'a str,
    written_at: DateTime<Utc>,
    search_queries: &'a [String],
    counts: RunCounts,
    per_category: &'a BTreeMap<Category, CategoryTally>,
    organized_findings: &'a OrganizedResults,
    downloaded_papers: Vec<DownloadedEntry<'a>>,
    errors: &'a [String],
    duration_ms: u64,
}

/// Write `summary.json` and `findings.json` into `run_dir`. Returns the
/// summary path.
pub fn write_summary(run_dir: &Path, result: &PipelineResult) -> Result<PathBuf, ScoutError> {
    std::fs::create_dir_all(run_dir)?;

    let summary = RunSummary {
        job_id: result.job_id,
        run_id: &result.run_id,
        written_at: Utc::now(),
        search_queries: &result.search_queries,
        counts: RunCounts {
            raw_papers_found: result.raw_papers_found,
            total_papers_found: result.total_papers_found,
            screened_papers: result.screened_papers,
            extracted_findings: result.extracted_findings,
            downloads_attempted: result.downloads_attempted,
            pdfs_downloaded: result.pdfs_downloaded,
        },
        per_category: &result.per_category,
        organized_findings: &result.organized_findings,
        downloaded_papers: result
            .downloaded_papers
            .iter()
            .map(|p| DownloadedEntry {
                title: &p.title,
                authors: &p.authors,
                year: p.year,
                source: p.source.to_string(),
                category: p.category,
                local_pdf_path: p.local_pdf_path.as_deref(),
                downloaded_at: p.downloaded_at,
                doi: p.doi.as_deref(),
                relevance_score: p.relevance_score,
            })
            .collect(),
        errors: &result.errors,
        duration_ms: result.duration_ms,
    };

    let summary_path = run_dir.join(SUMMARY_FILE);
    std::fs::write(&summary_path, serde_json::to_vec_pretty(&summary)?)?;
    std::fs::write(
        run_dir.join(FINDINGS_FILE),
        serde_json::to_vec_pretty(&result.all_findings)?,
    )?;

    tracing::info!(path = %summary_path.display(), "Run summary written");
    Ok(summary_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Paper, PaperSource};

    fn empty_result() -> PipelineResult {
        PipelineResult {
            job_id: Uuid::new_v4(),
            run_id: "run_test".to_string(),
            search_queries: vec!["robot empathy definition".to_string()],
            raw_papers_found: 0,
            total_papers_found: 0,
            screened_papers: 0,
            extracted_findings: 0,
            downloads_attempted: 0,
            pdfs_downloaded: 0,
            per_category: BTreeMap::new(),
            organized_findings: OrganizedResults::default(),
            downloaded_papers: vec![],
            all_findings: vec![],
            errors: vec![],
            duration_ms: 12,
        }
    }

    #[test]
    fn test_write_summary_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut result = empty_result();
        let mut p = Paper::new("Downloaded one", PaperSource::Arxiv);
        p.downloaded = true;
        p.category = Some(Category::Behaviors);
        p.local_pdf_path = Some(dir.path().join("pdfs/behaviors/paper_01_2020.pdf"));
        result.downloaded_papers.push(p);
        result.pdfs_downloaded = 1;

        let path = write_summary(dir.path(), &result).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(json["run_id"], "run_test");
        assert_eq!(json["counts"]["pdfs_downloaded"], 1);
        assert_eq!(json["downloaded_papers"][0]["category"], "behaviors");
        assert_eq!(json["downloaded_papers"][0]["source"], "arxiv");
        assert!(json["organized_findings"]["empathic_behaviors"]["adaptive"].is_array());

        let findings = std::fs::read_to_string(dir.path().join(FINDINGS_FILE)).unwrap();
        assert_eq!(findings.trim(), "[]");
    }
}
