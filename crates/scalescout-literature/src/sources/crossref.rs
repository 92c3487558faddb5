//! CrossRef works search.
//!
//! API: https://api.crossref.org/works?query=...
//! Polite pool: pass `mailto` (see CrossRef etiquette).

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use scalescout_common::SandboxClient;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::models::{non_empty, normalize_ws, Paper, PaperSource};
use super::{ensure_success, LiteratureSource};

const CR_BASE_URL: &str = "https://api.crossref.org";
const CR_SELECT: &str =
    "DOI,title,abstract,author,container-title,published-print,published,issued,link,license,is-referenced-by-count,URL";
pub const DEFAULT_RPM: u32 = 3000;

pub struct CrossRefClient {
    client: SandboxClient,
    base_url: String,
    mailto: Option<String>,
    rpm: u32,
}

impl CrossRefClient {
    pub fn new(client: SandboxClient, mailto: Option<String>) -> Self {
        Self {
            client,
            base_url: CR_BASE_URL.to_string(),
            mailto: mailto.filter(|m| !m.is_empty()),
            rpm: DEFAULT_RPM,
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_rate_limit(mut self, rpm: u32) -> Self {
        self.rpm = rpm;
        self
    }
}

#[async_trait]
impl LiteratureSource for CrossRefClient {
    fn source(&self) -> PaperSource { PaperSource::CrossRef }

    fn requests_per_minute(&self) -> u32 { self.rpm }

    #[instrument(skip(self))]
    async fn search(&self, query: &str, max_results: usize) -> anyhow::Result<Vec<Paper>> {
        let url = format!("{}/works", self.base_url);
        let mut params = vec![
            ("query", query.to_string()),
            ("rows", max_results.to_string()),
            ("select", CR_SELECT.to_string()),
        ];
        if let Some(ref mailto) = self.mailto {
            params.push(("mailto", mailto.clone()));
        }

        let resp = self.client.get(&url)?.query(&params).send().await?;
        let body: Value = ensure_success(self.source(), resp)?.json().await?;
        let works = body["message"]["items"].as_array().cloned().unwrap_or_default();
        debug!(n = works.len(), "CrossRef search results");

        Ok(works
            .iter()
            .filter_map(work_to_paper)
            .map(|mut p| {
                p.search_query = Some(query.to_string());
                p
            })
            .collect())
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────

fn first_str(v: &Value) -> Option<&str> {
    v.as_array().and_then(|a| a.first()).and_then(Value::as_str)
}

fn jats_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"</?jats:[^>]*>").unwrap())
}

/// CrossRef abstracts are JATS XML snippets.
fn strip_jats(raw: &str) -> String {
    normalize_ws(&jats_tag_re().replace_all(raw, " "))
}

/// Year from the first date that carries one: print, then generic, then issued.
fn work_year(work: &Value) -> Option<i32> {
    ["published-print", "published", "issued"]
        .iter()
        .find_map(|key| {
            work[*key]["date-parts"]
                .as_array()
                .and_then(|dp| dp.first())
                .and_then(|parts| parts.get(0))
                .and_then(Value::as_i64)
        })
        .map(|y| y as i32)
}

fn work_to_paper(work: &Value) -> Option<Paper> {
    let mut paper = Paper::new(first_str(&work["title"]).unwrap_or(""), PaperSource::CrossRef);
    if paper.title.is_empty() {
        return None;
    }

    paper.doi = non_empty(work["DOI"].as_str());
    paper.abstract_text = work["abstract"].as_str().map(strip_jats).unwrap_or_default();
    paper.authors = work["author"]
        .as_array()
        .map(|authors| {
            authors
                .iter()
                .filter_map(|a| {
                    let given  = a["given"].as_str().unwrap_or("").trim();
                    let family = a["family"].as_str().unwrap_or("").trim();
                    let name = match (given.is_empty(), family.is_empty()) {
                        (false, false) => format!("{given} {family}"),
                        (true, false)  => family.to_string(),
                        _              => a["name"].as_str().unwrap_or("").trim().to_string(),
                    };
                    Some(name).filter(|n| !n.is_empty())
                })
                .collect()
        })
        .unwrap_or_default();
    paper.venue = non_empty(first_str(&work["container-title"]));
    paper.year = work_year(work);
    paper.url = non_empty(work["URL"].as_str())
        .or_else(|| paper.doi.as_ref().map(|d| format!("https://doi.org/{d}")));
    paper.pdf_url = work["link"].as_array().and_then(|links| {
        links
            .iter()
            .find(|l| l["content-type"].as_str() == Some("application/pdf"))
            .and_then(|l| non_empty(l["URL"].as_str()))
    });
    paper.citation_count = work["is-referenced-by-count"].as_u64();
    paper.is_open_access = work["license"].as_array().map(|l| !l.is_empty()).unwrap_or(false);
    paper.paper_id = paper.doi.clone();
    Some(paper)
}
