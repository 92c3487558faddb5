//! OpenAlex works search.
//!
//! API: https://api.openalex.org/works?search=...
//! Abstracts arrive as an inverted index (token → positions).

use std::collections::BTreeMap;

use async_trait::async_trait;
use scalescout_common::SandboxClient;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::models::{non_empty, normalize_ws, Paper, PaperSource};
use super::{ensure_success, LiteratureSource};

const OA_BASE_URL: &str = "https://api.openalex.org";
const OA_SELECT: &str = "id,display_name,publication_year,primary_location,authorships,doi,\
                         cited_by_count,open_access,abstract_inverted_index";
pub const DEFAULT_RPM: u32 = 600;

pub struct OpenAlexClient {
    client: SandboxClient,
    base_url: String,
    mailto: Option<String>,
    rpm: u32,
}

impl OpenAlexClient {
    pub fn new(client: SandboxClient, mailto: Option<String>) -> Self {
        Self {
            client,
            base_url: OA_BASE_URL.to_string(),
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

#[derive(Debug, Deserialize)]
struct WorksResponse {
    #[serde(default)]
    results: Vec<Work>,
}

#[derive(Debug, Deserialize)]
struct Work {
    id: Option<String>,
    display_name: Option<String>,
    publication_year: Option<i32>,
    doi: Option<String>,
    cited_by_count: Option<u64>,
    primary_location: Option<Location>,
    #[serde(default)]
    authorships: Vec<Authorship>,
    open_access: Option<OpenAccess>,
    abstract_inverted_index: Option<BTreeMap<String, Vec<u32>>>,
}

#[derive(Debug, Deserialize)]
struct Location {
    landing_page_url: Option<String>,
    pdf_url: Option<String>,
    source: Option<LocationSource>,
}

#[derive(Debug, Deserialize)]
struct LocationSource {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Authorship {
    author: Option<AuthorObj>,
}

#[derive(Debug, Deserialize)]
struct AuthorObj {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAccess {
    #[serde(default)]
    is_oa: bool,
    oa_url: Option<String>,
}

#[async_trait]
impl LiteratureSource for OpenAlexClient {
    fn source(&self) -> PaperSource { PaperSource::OpenAlex }

    fn requests_per_minute(&self) -> u32 { self.rpm }

    #[instrument(skip(self))]
    async fn search(&self, query: &str, max_results: usize) -> anyhow::Result<Vec<Paper>> {
        let url = format!("{}/works", self.base_url);
        let mut params = vec![
            ("search", query.to_string()),
            ("per-page", max_results.clamp(1, 200).to_string()),
            ("select", OA_SELECT.to_string()),
        ];
        if let Some(ref mailto) = self.mailto {
            params.push(("mailto", mailto.clone()));
        }

        let resp = self.client.get(&url)?.query(&params).send().await?;
        let body: WorksResponse = ensure_success(self.source(), resp)?.json().await?;
        debug!(n = body.results.len(), "OpenAlex search results");

        Ok(body.results.into_iter().filter_map(|w| to_paper(w, query)).collect())
    }
}

fn to_paper(w: Work, query: &str) -> Option<Paper> {
    let mut paper = Paper::new(w.display_name.as_deref().unwrap_or(""), PaperSource::OpenAlex);
    if paper.title.is_empty() {
        return None;
    }

    paper.abstract_text = w
        .abstract_inverted_index
        .map(|inv| inverted_index_to_text(&inv))
        .unwrap_or_default();
    paper.authors = w
        .authorships
        .into_iter()
        .filter_map(|a| a.author.and_then(|x| non_empty(x.display_name.as_deref())))
        .collect();
    paper.year = w.publication_year;
    // DOIs come back as "https://doi.org/10...."
    paper.doi = non_empty(w.doi.as_deref())
        .map(|d| d.strip_prefix("https://doi.org/").map(String::from).unwrap_or(d));
    if let Some(loc) = w.primary_location {
        paper.url = non_empty(loc.landing_page_url.as_deref());
        paper.pdf_url = non_empty(loc.pdf_url.as_deref());
        paper.venue = loc.source.and_then(|s| non_empty(s.display_name.as_deref()));
    }
    if let Some(oa) = w.open_access {
        paper.is_open_access = oa.is_oa;
        if paper.pdf_url.is_none() {
            paper.pdf_url = non_empty(oa.oa_url.as_deref()).filter(|u| u.ends_with(".pdf"));
        }
    }
    paper.citation_count = w.cited_by_count;
    paper.paper_id = w.id;
    paper.search_query = Some(query.to_string());
    Some(paper)
}

/// Rebuild abstract text from OpenAlex's token → positions map.
fn inverted_index_to_text(inv: &BTreeMap<String, Vec<u32>>) -> String {
    let mut positions: BTreeMap<u32, &str> = BTreeMap::new();
    for (tok, ps) in inv {
        for p in ps {
            positions.entry(*p).or_insert(tok.as_str());
        }
    }
    normalize_ws(&positions.into_values().collect::<Vec<_>>().join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverted_index_reconstruction() {
        let mut inv = BTreeMap::new();
        inv.insert("robots".to_string(), vec![1]);
        inv.insert("Empathic".to_string(), vec![0]);
        inv.insert("help.".to_string(), vec![3]);
        inv.insert("can".to_string(), vec![2]);
        assert_eq!(inverted_index_to_text(&inv), "Empathic robots can help.");
    }

    #[test]
    fn test_work_to_paper() {
        let body: WorksResponse = serde_json::from_value(serde_json::json!({
            "meta": { "count": 2 },
            "results": [
                {
                    "id": "https://openalex.org/W123",
                    "display_name": "Empathy scales for social robots",
                    "publication_year": 2020,
                    "doi": "https://doi.org/10.3389/frobt.2020.00001",
                    "cited_by_count": 9,
                    "primary_location": {
                        "landing_page_url": "https://www.frontiersin.org/articles/1",
                        "pdf_url": null,
                        "source": { "display_name": "Frontiers in Robotics and AI" }
                    },
                    "authorships": [{ "author": { "display_name": "A. Tapus" } }],
                    "open_access": { "is_oa": true, "oa_url": "https://www.frontiersin.org/1.pdf" },
                    "abstract_inverted_index": { "We": [0], "review": [1], "scales.": [2] }
                },
                { "id": "https://openalex.org/W124", "display_name": null }
            ]
        }))
        .unwrap();
        let papers: Vec<Paper> = body.results.into_iter().filter_map(|w| to_paper(w, "q")).collect();
        assert_eq!(papers.len(), 1);
        let p = &papers[0];
        assert_eq!(p.doi.as_deref(), Some("10.3389/frobt.2020.00001"));
        assert_eq!(p.venue.as_deref(), Some("Frontiers in Robotics and AI"));
        assert_eq!(p.abstract_text, "We review scales.");
        assert_eq!(p.pdf_url.as_deref(), Some("https://www.frontiersin.org/1.pdf"));
        assert_eq!(p.authors, vec!["A. Tapus"]);
        assert!(p.is_open_access);
    }
}
