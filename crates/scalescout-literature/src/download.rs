//! Categorized PDF downloader.
//!
//! Layout under the run directory:
//!
//! ```text
//! pdfs/
//!   definitions/paper_03_2021.pdf
//!   definitions/paper_03_2021.json   ← metadata sidecar, written even on failure
//!   behaviors/paper_01_unknown.json
//!   measurement/...
//! ```
//!
//! Categories are assigned round-robin by 1-based position, so the first
//! paper lands in `behaviors`, the second in `measurement`, the third in
//! `definitions`. Files are created with `create_new`; an existing file is
//! never overwritten.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use scalescout_common::{SandboxClient, ScoutError};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

use crate::models::{Category, CategoryTally, Paper, PaperSource};

pub const DEFAULT_DOWNLOAD_LIMIT: usize = 50;
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_PDF_BYTES: usize = 100 * 1024 * 1024;
const PDF_USER_AGENT: &str = "Mozilla/5.0 (compatible; scalescout/0.1; academic research)";

/// Every paper the downloader looked at, plus per-category tallies.
#[derive(Debug, Clone, Default)]
pub struct DownloadReport {
    /// All processed papers in input order, success or not.
    pub attempted: Vec<Paper>,
    pub per_category: BTreeMap<Category, CategoryTally>,
    pub errors: Vec<String>,
}

impl DownloadReport {
    pub fn downloaded(&self) -> Vec<Paper> {
        self.attempted.iter().filter(|p| p.downloaded).cloned().collect()
    }

    pub fn downloaded_count(&self) -> usize {
        self.attempted.iter().filter(|p| p.downloaded).count()
    }
}

/// Sidecar written next to each (attempted) PDF.
#[derive(Debug, Serialize)]
struct DownloadRecord<'a> {
    index: usize,
    title: &'a str,
    authors: &'a [String],
    year: Option<i32>,
    source: PaperSource,
    category: Category,
    url: Option<&'a str>,
    pdf_url: Option<&'a str>,
    doi: Option<&'a str>,
    relevance_score: Option<u8>,
    downloaded: bool,
    local_pdf_path: Option<&'a Path>,
    downloaded_at: Option<DateTime<Utc>>,
    sha256: Option<String>,
    bytes: Option<usize>,
    error: Option<String>,
}

pub struct CategorizedDownloader {
    client: SandboxClient,
    limit: usize,
    max_bytes: usize,
}

impl CategorizedDownloader {
    /// PDF hosts are arbitrary, so the allowlist is lifted.
    pub fn new(timeout: Duration) -> Result<Self, ScoutError> {
        let client = SandboxClient::with_settings(timeout, PDF_USER_AGENT)?.allow_all();
        Ok(Self { client, limit: DEFAULT_DOWNLOAD_LIMIT, max_bytes: DEFAULT_MAX_PDF_BYTES })
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Largest body accepted for a single PDF.
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Process the first `limit` papers. Failures are recorded, never raised.
    pub async fn download_all(&self, papers: &[Paper], run_dir: &Path) -> DownloadReport {
        let pdf_root = run_dir.join("pdfs");
        let mut report = DownloadReport {
            per_category: Category::ALL.iter().map(|c| (*c, CategoryTally::default())).collect(),
            ..Default::default()
        };

        for (offset, paper) in papers.iter().take(self.limit).enumerate() {
            let index = offset + 1;
            let category = category_for(index);
            let dir = pdf_root.join(category.as_str());
            let stem = file_stem(index, paper.year);

            let mut paper = paper.clone();
            paper.category = Some(category);
            paper.downloaded = false;
            paper.local_pdf_path = None;
            paper.downloaded_at = None;

            let outcome = match paper.pdf_url.as_deref() {
                Some(url) => self.fetch_to(url, &dir, &stem).await,
                None => Err(anyhow::anyhow!("no PDF URL")),
            };

            let (sha256, bytes, error) = match outcome {
                Ok(saved) => {
                    info!(title = %paper.title, category = %category, path = %saved.path.display(), "PDF downloaded");
                    paper.downloaded = true;
                    paper.local_pdf_path = Some(saved.path);
                    paper.downloaded_at = Some(Utc::now());
                    (Some(saved.sha256), Some(saved.bytes), None)
                }
                Err(e) => {
                    if paper.pdf_url.is_some() {
                        warn!(title = %paper.title, error = %e, "PDF download failed");
                        report.errors.push(format!("{stem}: {e}"));
                    } else {
                        debug!(title = %paper.title, "No PDF URL");
                    }
                    (None, None, Some(e.to_string()))
                }
            };

            let record = DownloadRecord {
                index,
                title: &paper.title,
                authors: &paper.authors,
                year: paper.year,
                source: paper.source,
                category,
                url: paper.url.as_deref(),
                pdf_url: paper.pdf_url.as_deref(),
                doi: paper.doi.as_deref(),
                relevance_score: paper.relevance_score,
                downloaded: paper.downloaded,
                local_pdf_path: paper.local_pdf_path.as_deref(),
                downloaded_at: paper.downloaded_at,
                sha256,
                bytes,
                error,
            };
            if let Err(e) = write_sidecar(&dir, &stem, &record).await {
                warn!(stem = %stem, error = %e, "Could not write metadata sidecar");
            }

            let tally = report.per_category.entry(category).or_default();
            tally.attempted += 1;
            if paper.downloaded {
                tally.downloaded += 1;
            }
            report.attempted.push(paper);
        }

        info!(
            attempted = report.attempted.len(),
            downloaded = report.downloaded_count(),
            "Downloads complete"
        );
        report
    }

    #[instrument(skip(self, dir))]
    async fn fetch_to(&self, url: &str, dir: &Path, stem: &str) -> anyhow::Result<SavedPdf> {
        let mut resp = self.client.get(url)?.send().await?;
        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("HTTP {}", status);
        }
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();
        if !content_type.contains("pdf") {
            warn!(url, content_type = %content_type, "Response may not be a PDF");
        }
        if let Some(len) = resp.content_length() {
            if len > self.max_bytes as u64 {
                anyhow::bail!("PDF is {len} bytes, over the {} byte limit", self.max_bytes);
            }
        }

        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(format!("{stem}.pdf"));
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;

        match self.stream_body(&mut resp, &mut file).await {
            Ok((sha256, bytes)) => Ok(SavedPdf { path, sha256, bytes }),
            Err(e) => {
                drop(file);
                if let Err(rm) = tokio::fs::remove_file(&path).await {
                    warn!(path = %path.display(), error = %rm, "Could not remove partial PDF");
                }
                Err(e)
            }
        }
    }

    /// Copy the body to `file` chunk by chunk, hashing as it goes.
    async fn stream_body(
        &self,
        resp: &mut reqwest::Response,
        file: &mut tokio::fs::File,
    ) -> anyhow::Result<(String, usize)> {
        let mut hasher = Sha256::new();
        let mut bytes = 0usize;
        while let Some(chunk) = resp.chunk().await? {
            bytes += chunk.len();
            if bytes > self.max_bytes {
                anyhow::bail!("PDF exceeds the {} byte limit", self.max_bytes);
            }
            hasher.update(&chunk);
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok((format!("{:x}", hasher.finalize()), bytes))
    }
}

struct SavedPdf {
    path: PathBuf,
    sha256: String,
    bytes: usize,
}

async fn write_sidecar(dir: &Path, stem: &str, record: &DownloadRecord<'_>) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    let json = serde_json::to_vec_pretty(record)?;
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dir.join(format!("{stem}.json")))
        .await?;
    file.write_all(&json).await?;
    file.flush().await?;
    Ok(())
}

/// Round-robin category for a 1-based position.
pub fn category_for(index: usize) -> Category {
    Category::ALL[index % Category::ALL.len()]
}

/// `paper_07_2019`, or `paper_07_unknown` without a year.
pub fn file_stem(index: usize, year: Option<i32>) -> String {
    match year {
        Some(y) => format!("paper_{index:02}_{y}"),
        None => format!("paper_{index:02}_unknown"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_robin_starts_at_behaviors() {
        let cats: Vec<Category> = (1..=4).map(category_for).collect();
        assert_eq!(
            cats,
            vec![Category::Behaviors, Category::Measurement, Category::Definitions, Category::Behaviors]
        );
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem(3, Some(2021)), "paper_03_2021");
        assert_eq!(file_stem(12, None), "paper_12_unknown");
    }

    #[tokio::test]
    async fn test_papers_without_url_are_accounted_for() {
        let dir = tempfile::tempdir().unwrap();
        let papers = vec![
            Paper::new("No link one", PaperSource::CrossRef),
            Paper::new("No link two", PaperSource::CrossRef),
        ];
        let dl = CategorizedDownloader::new(Duration::from_secs(5)).unwrap();
        let report = dl.download_all(&papers, dir.path()).await;

        assert_eq!(report.attempted.len(), 2);
        assert_eq!(report.downloaded_count(), 0);
        assert!(report.errors.is_empty());
        assert!(report.attempted.iter().all(|p| !p.downloaded && p.local_pdf_path.is_none()));
        assert_eq!(report.per_category[&Category::Behaviors].attempted, 1);
        assert_eq!(report.per_category[&Category::Measurement].attempted, 1);
        assert_eq!(report.per_category[&Category::Definitions].attempted, 0);

        let sidecar = dir.path().join("pdfs/behaviors/paper_01_unknown.json");
        let json: serde_json::Value =
            serde_json::from_slice(&std::fs::read(sidecar).unwrap()).unwrap();
        assert_eq!(json["downloaded"], false);
        assert_eq!(json["error"], "no PDF URL");
    }

    fn linked(title: &str, url: String) -> Paper {
        let mut p = Paper::new(title, PaperSource::Arxiv);
        p.year = Some(2020);
        p.pdf_url = Some(url);
        p
    }

    #[tokio::test]
    async fn test_saved_pdf_is_hashed() {
        let mut server = mockito::Server::new_async().await;
        let body = b"%PDF-1.4 streamed body".to_vec();
        server
            .mock("GET", "/a.pdf")
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .with_body(body.clone())
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dl = CategorizedDownloader::new(Duration::from_secs(5)).unwrap();
        let papers = vec![linked("Hashed", format!("{}/a.pdf", server.url()))];
        let report = dl.download_all(&papers, dir.path()).await;
        assert_eq!(report.downloaded_count(), 1);

        let pdf = dir.path().join("pdfs/behaviors/paper_01_2020.pdf");
        assert_eq!(std::fs::read(&pdf).unwrap(), body);
        let sidecar: serde_json::Value = serde_json::from_slice(
            &std::fs::read(dir.path().join("pdfs/behaviors/paper_01_2020.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(sidecar["sha256"], format!("{:x}", Sha256::digest(&body)));
        assert_eq!(sidecar["bytes"], body.len());
    }

    #[tokio::test]
    async fn test_oversized_pdf_leaves_no_partial_file() {
        use std::io::Write as _;

        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/sized.pdf")
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .with_body(vec![b'x'; 4096])
            .create_async()
            .await;
        server
            .mock("GET", "/chunked.pdf")
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .with_chunked_body(|w| {
                for _ in 0..8 {
                    w.write_all(&[b'y'; 512])?;
                }
                Ok(())
            })
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dl = CategorizedDownloader::new(Duration::from_secs(5)).unwrap().with_max_bytes(1024);
        let papers = vec![
            linked("Sized", format!("{}/sized.pdf", server.url())),
            linked("Chunked", format!("{}/chunked.pdf", server.url())),
        ];
        let report = dl.download_all(&papers, dir.path()).await;

        assert_eq!(report.downloaded_count(), 0);
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors.iter().all(|e| e.contains("byte limit")));
        assert!(!dir.path().join("pdfs/behaviors/paper_01_2020.pdf").exists());
        assert!(!dir.path().join("pdfs/measurement/paper_02_2020.pdf").exists());
        assert!(dir.path().join("pdfs/measurement/paper_02_2020.json").exists());
    }

    #[tokio::test]
    async fn test_limit_caps_processed_papers() {
        let dir = tempfile::tempdir().unwrap();
        let papers: Vec<Paper> = (0..5)
            .map(|i| Paper::new(&format!("Paper {i}"), PaperSource::Arxiv))
            .collect();
        let dl = CategorizedDownloader::new(Duration::from_secs(5)).unwrap().with_limit(3);
        assert_eq!(dl.download_all(&papers, dir.path()).await.attempted.len(), 3);
    }
}
