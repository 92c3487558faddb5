//! arXiv API client (Atom feed).
//!
//! Endpoint: http://export.arxiv.org/api/query
//! arXiv asks for no more than one request every three seconds.

use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use scalescout_common::SandboxClient;
use tracing::{debug, instrument, warn};

use crate::models::{normalize_ws, non_empty, Paper, PaperSource};
use super::{ensure_success, LiteratureSource};

const ARXIV_BASE_URL: &str = "http://export.arxiv.org";
pub const DEFAULT_RPM: u32 = 20;

pub struct ArxivClient {
    client: SandboxClient,
    base_url: String,
    rpm: u32,
}

impl ArxivClient {
    pub fn new(client: SandboxClient) -> Self {
        Self {
            client,
            base_url: ARXIV_BASE_URL.to_string(),
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
impl LiteratureSource for ArxivClient {
    fn source(&self) -> PaperSource { PaperSource::Arxiv }

    fn requests_per_minute(&self) -> u32 { self.rpm }

    #[instrument(skip(self))]
    async fn search(&self, query: &str, max_results: usize) -> anyhow::Result<Vec<Paper>> {
        let url = format!("{}/api/query", self.base_url);
        let search_query = format!("all:{query}");
        let max = max_results.to_string();
        let resp = self.client
            .get(&url)?
            .query(&[
                ("search_query", search_query.as_str()),
                ("start", "0"),
                ("max_results", max.as_str()),
                ("sortBy", "relevance"),
                ("sortOrder", "descending"),
            ])
            .send()
            .await?;
        let xml = ensure_success(self.source(), resp)?.text().await?;

        let mut papers = parse_atom_feed(&xml);
        for p in &mut papers {
            p.search_query = Some(query.to_string());
        }
        debug!(n = papers.len(), "arXiv search returned entries");
        Ok(papers)
    }
}

// ── Atom parsing ──────────────────────────────────────────────────────────────

#[derive(Default)]
struct EntryState {
    id: String,
    title: String,
    summary: String,
    published: String,
    authors: Vec<String>,
    doi: Option<String>,
    journal_ref: Option<String>,
    pdf_url: Option<String>,
}

impl EntryState {
    fn finish(self) -> Option<Paper> {
        let mut paper = Paper::new(&self.title, PaperSource::Arxiv);
        if paper.title.is_empty() {
            return None;
        }
        let abs_url = non_empty(Some(&self.id));
        paper.abstract_text = normalize_ws(&self.summary);
        paper.authors = self.authors;
        paper.year = self.published.get(..4).and_then(|y| y.parse().ok());
        paper.venue = self.journal_ref.or_else(|| Some("arXiv".to_string()));
        paper.doi = self.doi;
        paper.pdf_url = self.pdf_url.or_else(|| abs_url.as_deref().map(abs_to_pdf));
        paper.paper_id = abs_url.as_deref().map(arxiv_id);
        paper.url = abs_url;
        // Every arXiv preprint is freely downloadable.
        paper.is_open_access = true;
        Some(paper)
    }
}

/// `http://arxiv.org/abs/2101.00001v2` → `http://arxiv.org/pdf/2101.00001v2`
fn abs_to_pdf(abs: &str) -> String {
    abs.replacen("/abs/", "/pdf/", 1)
}

fn arxiv_id(abs: &str) -> String {
    abs.rsplit_once("/abs/")
        .map(|(_, id)| id.to_string())
        .unwrap_or_else(|| abs.to_string())
}

#[derive(Clone, Copy, PartialEq)]
enum Field {
    None,
    Id,
    Title,
    Summary,
    Published,
    AuthorName,
    Doi,
    JournalRef,
}

impl Field {
    fn from_tag(tag: &[u8], in_author: bool) -> Field {
        match tag {
            b"id"          => Field::Id,
            b"title"       => Field::Title,
            b"summary"     => Field::Summary,
            b"published"   => Field::Published,
            b"name" if in_author => Field::AuthorName,
            b"doi"         => Field::Doi,
            b"journal_ref" => Field::JournalRef,
            _              => Field::None,
        }
    }
}

/// A `<link>` pointing at the PDF rendition.
fn pdf_link(e: &BytesStart<'_>) -> Option<String> {
    let mut href = None;
    let mut is_pdf = false;
    for attr in e.attributes().flatten() {
        let value = attr.unescape_value().unwrap_or_default();
        match attr.key.local_name().as_ref() {
            b"href" => href = Some(value.to_string()),
            b"title" if value == "pdf" => is_pdf = true,
            b"type" if value == "application/pdf" => is_pdf = true,
            _ => {}
        }
    }
    href.filter(|_| is_pdf)
}

/// Parse an arXiv Atom feed. Tags are matched by local name, so the
/// `arxiv:` extension elements (doi, journal_ref) are picked up too.
fn parse_atom_feed(xml: &str) -> Vec<Paper> {
    let mut papers = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut current: Option<EntryState> = None;
    let mut field = Field::None;
    let mut text = String::new();
    let mut in_author = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let local = e.local_name();
                match local.as_ref() {
                    b"entry" => current = Some(EntryState::default()),
                    b"author" => in_author = true,
                    b"link" => {
                        if let (Some(entry), Some(href)) = (current.as_mut(), pdf_link(e)) {
                            entry.pdf_url.get_or_insert(href);
                        }
                    }
                    tag if current.is_some() && field == Field::None => {
                        field = Field::from_tag(tag, in_author);
                        text.clear();
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(ref e)) => {
                if e.local_name().as_ref() == b"link" {
                    if let (Some(entry), Some(href)) = (current.as_mut(), pdf_link(e)) {
                        entry.pdf_url.get_or_insert(href);
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
                match local.as_ref() {
                    b"entry" => {
                        field = Field::None;
                        if let Some(paper) = current.take().and_then(EntryState::finish) {
                            papers.push(paper);
                        }
                    }
                    b"author" => in_author = false,
                    tag if Field::from_tag(tag, in_author) == field && field != Field::None => {
                        if let Some(ref mut entry) = current {
                            let value = normalize_ws(&text);
                            match field {
                                Field::Id         => entry.id = value,
                                Field::Title      => entry.title = value,
                                Field::Summary    => entry.summary = value,
                                Field::Published  => entry.published = value,
                                Field::AuthorName => {
                                    if !value.is_empty() {
                                        entry.authors.push(value);
                                    }
                                }
                                Field::Doi        => entry.doi = Some(value).filter(|v| !v.is_empty()),
                                Field::JournalRef => entry.journal_ref = Some(value).filter(|v| !v.is_empty()),
                                Field::None       => {}
                            }
                        }
                        field = Field::None;
                        text.clear();
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!("arXiv Atom parse error: {}", e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    papers
}
