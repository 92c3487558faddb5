//! PubMed E-utilities client.
//!
//! Endpoints used:
//!   esearch: {base}/esearch.fcgi  (JSON, PMIDs only)
//!   efetch:  {base}/efetch.fcgi   (XML, full citation + abstract)
//!
//! NCBI allows 3 requests/s anonymously and 10/s with an API key.

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use scalescout_common::SandboxClient;
use tracing::{debug, instrument, warn};

use crate::models::{normalize_ws, Paper, PaperSource};
use super::{ensure_success, LiteratureSource};

const EUTILS_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
pub const DEFAULT_RPM: u32 = 180;
pub const KEYED_RPM: u32 = 600;

pub struct PubMedClient {
    client: SandboxClient,
    base_url: String,
    api_key: Option<String>,
    rpm: u32,
}

impl PubMedClient {
    pub fn new(client: SandboxClient, api_key: Option<String>) -> Self {
        let api_key = api_key.filter(|k| !k.is_empty());
        let rpm = if api_key.is_some() { KEYED_RPM } else { DEFAULT_RPM };
        Self {
            client,
            base_url: EUTILS_BASE_URL.to_string(),
            api_key,
            rpm,
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

    fn key_param(&self, params: &mut Vec<(&'static str, String)>) {
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }
    }

    /// Search PubMed and return a list of PMIDs.
    #[instrument(skip(self))]
    async fn esearch(&self, query: &str, max: usize) -> anyhow::Result<Vec<String>> {
        let mut params = vec![
            ("db", "pubmed".to_string()),
            ("term", query.to_string()),
            ("retmax", max.to_string()),
            ("retmode", "json".to_string()),
            ("sort", "relevance".to_string()),
        ];
        self.key_param(&mut params);

        let url = format!("{}/esearch.fcgi", self.base_url);
        let resp = self.client.get(&url)?.query(&params).send().await?;
        let body: serde_json::Value = ensure_success(self.source(), resp)?.json().await?;

        let ids: Vec<String> = body["esearchresult"]["idlist"]
            .as_array()
            .map(|ids| ids.iter().filter_map(|v| v.as_str().map(String::from)).collect())
            .unwrap_or_default();

        debug!(?ids, "PubMed esearch returned PMIDs");
        Ok(ids)
    }

    #[instrument(skip(self, pmids), fields(n = pmids.len()))]
    async fn efetch(&self, pmids: &[String]) -> anyhow::Result<String> {
        let mut params = vec![
            ("db", "pubmed".to_string()),
            ("id", pmids.join(",")),
            ("rettype", "abstract".to_string()),
            ("retmode", "xml".to_string()),
        ];
        self.key_param(&mut params);

        let url = format!("{}/efetch.fcgi", self.base_url);
        let resp = self.client.get(&url)?.query(&params).send().await?;
        Ok(ensure_success(self.source(), resp)?.text().await?)
    }
}

#[async_trait]
impl LiteratureSource for PubMedClient {
    fn source(&self) -> PaperSource { PaperSource::PubMed }

    fn requests_per_minute(&self) -> u32 { self.rpm }

    async fn search(&self, query: &str, max_results: usize) -> anyhow::Result<Vec<Paper>> {
        let pmids = self.esearch(query, max_results).await?;
        if pmids.is_empty() {
            return Ok(vec![]);
        }
        let xml = self.efetch(&pmids).await?;
        let mut papers = parse_pubmed_xml(&xml);
        for p in &mut papers {
            p.search_query = Some(query.to_string());
        }
        Ok(papers)
    }
}

// ── XML parsing ───────────────────────────────────────────────────────────────

#[derive(Default)]
struct ArticleState {
    pmid: Option<String>,
    title: String,
    abstract_parts: Vec<String>,
    authors: Vec<String>,
    journal: Option<String>,
    year: Option<i32>,
    medline_date: Option<String>,
    doi: Option<String>,
}

impl ArticleState {
    fn finish(self) -> Option<Paper> {
        let mut paper = Paper::new(&self.title, PaperSource::PubMed);
        if paper.title.is_empty() {
            warn!(pmid = ?self.pmid, "Skipping PubMed record with empty title");
            return None;
        }
        paper.abstract_text = normalize_ws(&self.abstract_parts.join(" "));
        paper.authors = self.authors;
        paper.venue = self.journal;
        paper.year = self.year.or_else(|| self.medline_date.as_deref().and_then(leading_year));
        paper.doi = self.doi;
        paper.url = self.pmid.as_ref().map(|id| format!("https://pubmed.ncbi.nlm.nih.gov/{id}/"));
        paper.paper_id = self.pmid;
        Some(paper)
    }
}

/// First four-digit run in a MedlineDate such as "2019 Nov-Dec".
fn leading_year(s: &str) -> Option<i32> {
    s.split(|c: char| !c.is_ascii_digit())
        .find(|tok| tok.len() == 4)
        .and_then(|tok| tok.parse().ok())
}

#[derive(Clone, Copy, PartialEq)]
enum Field {
    None,
    Pmid,
    Title,
    Abstract,
    LastName,
    ForeName,
    CollectiveName,
    JournalTitle,
    Year,
    MedlineDate,
    Doi,
}

impl Field {
    /// Closing tag that ends the field.
    fn tag(self) -> &'static [u8] {
        match self {
            Field::None           => b"",
            Field::Pmid           => b"PMID",
            Field::Title          => b"ArticleTitle",
            Field::Abstract       => b"AbstractText",
            Field::LastName       => b"LastName",
            Field::ForeName       => b"ForeName",
            Field::CollectiveName => b"CollectiveName",
            Field::JournalTitle   => b"Title",
            Field::Year           => b"Year",
            Field::MedlineDate    => b"MedlineDate",
            Field::Doi            => b"ArticleId",
        }
    }
}

#[derive(Default)]
struct AuthorState {
    active: bool,
    last: String,
    fore: String,
    collective: String,
}

impl AuthorState {
    fn full_name(&self) -> String {
        match (self.fore.is_empty(), self.last.is_empty()) {
            (false, false) => format!("{} {}", self.fore, self.last),
            (true, false)  => self.last.clone(),
            _              => self.collective.clone(),
        }
    }
}

/// Parse efetch XML (`<PubmedArticleSet><PubmedArticle>...`) into papers.
/// Malformed XML yields whatever was complete before the error.
fn parse_pubmed_xml(xml: &str) -> Vec<Paper> {
    let mut papers = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut current: Option<ArticleState> = None;
    let mut field = Field::None;
    let mut text = String::new();
    let mut in_journal  = false;
    let mut in_pub_date = false;
    let mut author = AuthorState::default();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let local = e.local_name();
                match current {
                    None => {
                        if local.as_ref() == b"PubmedArticle" {
                            current = Some(ArticleState::default());
                        }
                    }
                    // Inline markup inside a field (<i>, <sup>) is flattened into it.
                    Some(_) if field != Field::None => {}
                    Some(ref art) => {
                        let next = match local.as_ref() {
                            // Only the article's own PMID; CommentsCorrections carry others.
                            b"PMID" if art.pmid.is_none()     => Field::Pmid,
                            b"ArticleTitle"                   => Field::Title,
                            b"AbstractText"                   => Field::Abstract,
                            b"Title" if in_journal            => Field::JournalTitle,
                            b"Year" if in_pub_date            => Field::Year,
                            b"MedlineDate" if in_pub_date     => Field::MedlineDate,
                            b"LastName" if author.active      => Field::LastName,
                            b"ForeName" if author.active      => Field::ForeName,
                            b"CollectiveName" if author.active => Field::CollectiveName,
                            b"ArticleId" if art.doi.is_none() && is_doi_id(e) => Field::Doi,
                            b"Journal" => { in_journal = true; Field::None }
                            b"PubDate" => { in_pub_date = true; Field::None }
                            b"Author"  => {
                                author = AuthorState { active: true, ..Default::default() };
                                Field::None
                            }
                            _ => Field::None,
                        };
                        if next != Field::None {
                            field = next;
                            text.clear();
                        }
                    }
                }
            }
            Ok(Event::Text(ref e)) if field != Field::None => {
                let chunk = e.unescape().unwrap_or_default();
                if !text.is_empty() {
                    text.push(' ');
                }
                text.push_str(&chunk);
            }
            Ok(Event::End(ref e)) => {
                let local = e.local_name();
                let name = local.as_ref();
                if let Some(ref mut art) = current {
                    if field != Field::None && name == field.tag() {
                        let value = normalize_ws(&text);
                        match field {
                            Field::Pmid           => art.pmid = Some(value),
                            Field::Title          => art.title = value,
                            Field::Abstract       => {
                                if !value.is_empty() {
                                    art.abstract_parts.push(value);
                                }
                            }
                            Field::JournalTitle   => art.journal = Some(value).filter(|v| !v.is_empty()),
                            Field::Year           => art.year = value.parse().ok(),
                            Field::MedlineDate    => art.medline_date = Some(value),
                            Field::LastName       => author.last = value,
                            Field::ForeName       => author.fore = value,
                            Field::CollectiveName => author.collective = value,
                            Field::Doi            => art.doi = Some(value).filter(|v| !v.is_empty()),
                            Field::None           => {}
                        }
                        field = Field::None;
                        text.clear();
                    } else if field == Field::None {
                        match name {
                            b"Journal" => in_journal = false,
                            b"PubDate" => in_pub_date = false,
                            b"Author" if author.active => {
                                let full = author.full_name();
                                if !full.is_empty() {
                                    art.authors.push(full);
                                }
                                author.active = false;
                            }
                            _ => {}
                        }
                    }
                }
                if name == b"PubmedArticle" {
                    field = Field::None;
                    if let Some(paper) = current.take().and_then(ArticleState::finish) {
                        papers.push(paper);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!("PubMed XML parse error: {}", e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    papers
}

fn is_doi_id(e: &quick_xml::events::BytesStart<'_>) -> bool {
    e.attributes()
        .flatten()
        .any(|a| a.key.local_name().as_ref() == b"IdType" && a.value.as_ref() == b"doi")
}
