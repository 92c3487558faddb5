//! Semantic Scholar Graph API client.
//!
//! Endpoint: https://api.semanticscholar.org/graph/v1/paper/search
//! Free tier without a key; a key goes in the `x-api-key` header.

use async_trait::async_trait;
use scalescout_common::SandboxClient;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::models::{non_empty, Paper, PaperSource};
use super::{ensure_success, LiteratureSource};

const S2_BASE_URL: &str = "https://api.semanticscholar.org";
const S2_FIELDS: &str =
    "paperId,title,authors,year,venue,abstract,citationCount,openAccessPdf,url,isOpenAccess,externalIds";
pub const DEFAULT_RPM: u32 = 100;

pub struct SemanticScholarClient {
    client: SandboxClient,
    base_url: String,
    api_key: Option<String>,
    rpm: u32,
}

impl SemanticScholarClient {
    pub fn new(client: SandboxClient) -> Self {
        Self {
            client,
            base_url: S2_BASE_URL.to_string(),
            api_key: None,
            rpm: DEFAULT_RPM,
        }
    }

    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key.filter(|k| !k.is_empty());
        self
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

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<S2Paper>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct S2Paper {
    paper_id: Option<String>,
    title: Option<String>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    #[serde(default)]
    authors: Vec<S2Author>,
    year: Option<i32>,
    venue: Option<String>,
    url: Option<String>,
    citation_count: Option<u64>,
    #[serde(default)]
    is_open_access: bool,
    open_access_pdf: Option<S2Pdf>,
    external_ids: Option<S2ExternalIds>,
}

#[derive(Debug, Deserialize)]
struct S2Author {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct S2Pdf {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct S2ExternalIds {
    #[serde(rename = "DOI")]
    doi: Option<String>,
}

#[async_trait]
impl LiteratureSource for SemanticScholarClient {
    fn source(&self) -> PaperSource { PaperSource::SemanticScholar }

    fn requests_per_minute(&self) -> u32 { self.rpm }

    #[instrument(skip(self))]
    async fn search(&self, query: &str, max_results: usize) -> anyhow::Result<Vec<Paper>> {
        let url = format!("{}/graph/v1/paper/search", self.base_url);
        let limit = max_results.clamp(1, 100).to_string();
        let mut req = self.client
            .get(&url)?
            .query(&[("query", query), ("limit", limit.as_str()), ("fields", S2_FIELDS)]);
        if let Some(ref key) = self.api_key {
            req = req.header("x-api-key", key);
        }

        let resp = ensure_success(self.source(), req.send().await?)?;
        let body: SearchResponse = resp.json().await?;
        debug!(n = body.data.len(), "Semantic Scholar search returned results");

        Ok(body.data.into_iter().filter_map(|p| to_paper(p, query)).collect())
    }
}

fn to_paper(p: S2Paper, query: &str) -> Option<Paper> {
    let mut paper = Paper::new(p.title.as_deref().unwrap_or(""), PaperSource::SemanticScholar);
    if paper.title.is_empty() {
        return None;
    }
    paper.abstract_text = p.abstract_text.unwrap_or_default().trim().to_string();
    paper.authors = p.authors.into_iter().filter_map(|a| non_empty(a.name.as_deref())).collect();
    paper.year = p.year;
    paper.venue = non_empty(p.venue.as_deref());
    paper.url = non_empty(p.url.as_deref());
    paper.pdf_url = p.open_access_pdf.and_then(|pdf| non_empty(pdf.url.as_deref()));
    paper.doi = p.external_ids.and_then(|ids| non_empty(ids.doi.as_deref()));
    paper.paper_id = p.paper_id;
    paper.citation_count = p.citation_count;
    paper.is_open_access = p.is_open_access;
    paper.search_query = Some(query.to_string());
    Some(paper)
}
