//! Data models for the literature pipeline.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use scalescout_common::ScoutError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

// ── Research context ──────────────────────────────────────────────────────────

/// A free-text field that upstream may hand over as one string or a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextOrList {
    Text(String),
    List(Vec<String>),
}

impl TextOrList {
    pub fn joined(&self, sep: &str) -> String {
        match self {
            TextOrList::Text(s)  => s.clone(),
            TextOrList::List(v)  => v.join(sep),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            TextOrList::Text(s)  => s.trim().is_empty(),
            TextOrList::List(v)  => v.iter().all(|s| s.trim().is_empty()),
        }
    }
}

/// Structured description of the collaboration scenario, as produced by the
/// interview stage. Read-only to the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchContext {
    #[serde(default)]
    pub assessment_context: String,
    #[serde(default)]
    pub robot_platform: String,
    #[serde(default)]
    pub interaction_modalities: Option<TextOrList>,
    #[serde(default)]
    pub assessment_goals: Vec<String>,
    /// Remaining interview fields, kept for downstream consumers.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

const NOT_AVAILABLE: &str = "N/A";

impl ResearchContext {
    /// The scenario description is the one field nothing downstream can do without.
    pub fn validate(&self) -> Result<(), ScoutError> {
        if self.assessment_context.trim().is_empty() {
            return Err(ScoutError::InvalidContext(
                "assessment_context is missing or empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn platform(&self) -> &str {
        non_blank_or_na(&self.robot_platform)
    }

    pub fn modalities(&self) -> String {
        match &self.interaction_modalities {
            Some(m) if !m.is_blank() => m.joined(", "),
            _ => NOT_AVAILABLE.to_string(),
        }
    }

    pub fn goals(&self) -> String {
        let goals: Vec<&str> = self.assessment_goals
            .iter()
            .map(|g| g.trim())
            .filter(|g| !g.is_empty())
            .collect();
        if goals.is_empty() {
            NOT_AVAILABLE.to_string()
        } else {
            goals.join(", ")
        }
    }
}

fn non_blank_or_na(s: &str) -> &str {
    if s.trim().is_empty() { NOT_AVAILABLE } else { s }
}

// ── Paper ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaperSource {
    SemanticScholar,
    Arxiv,
    PubMed,
    CrossRef,
    OpenAlex,
}

impl PaperSource {
    pub const ALL: [PaperSource; 5] = [
        PaperSource::SemanticScholar,
        PaperSource::Arxiv,
        PaperSource::PubMed,
        PaperSource::CrossRef,
        PaperSource::OpenAlex,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaperSource::SemanticScholar => "semantic_scholar",
            PaperSource::Arxiv           => "arxiv",
            PaperSource::PubMed          => "pubmed",
            PaperSource::CrossRef        => "crossref",
            PaperSource::OpenAlex        => "openalex",
        }
    }
}

impl fmt::Display for PaperSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaperSource {
    type Err = ScoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "semantic_scholar" | "semanticscholar" | "s2" => Ok(PaperSource::SemanticScholar),
            "arxiv"                                       => Ok(PaperSource::Arxiv),
            "pubmed"                                      => Ok(PaperSource::PubMed),
            "crossref"                                    => Ok(PaperSource::CrossRef),
            "openalex"                                    => Ok(PaperSource::OpenAlex),
            other => Err(ScoutError::Config(format!("unknown literature source: {other}"))),
        }
    }
}

/// Taxonomy label a downloaded paper is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Definitions,
    Behaviors,
    Measurement,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Definitions, Category::Behaviors, Category::Measurement];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Definitions => "definitions",
            Category::Behaviors   => "behaviors",
            Category::Measurement => "measurement",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ScoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "definitions" => Ok(Category::Definitions),
            "behaviors"   => Ok(Category::Behaviors),
            "measurement" => Ok(Category::Measurement),
            other => Err(ScoutError::Config(format!("unknown category: {other}"))),
        }
    }
}

/// Normalised bibliographic record. Later stages fill in the derived fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub authors: Vec<String>,
    pub year: Option<i32>,
    pub venue: Option<String>,
    pub source: PaperSource,
    pub url: Option<String>,
    pub pdf_url: Option<String>,
    pub doi: Option<String>,
    pub paper_id: Option<String>,
    pub citation_count: Option<u64>,
    pub is_open_access: bool,
    pub search_query: Option<String>,

    pub relevance_score: Option<u8>,
    pub relevance_reason: Option<String>,
    pub category: Option<Category>,
    pub downloaded: bool,
    pub local_pdf_path: Option<PathBuf>,
    pub downloaded_at: Option<DateTime<Utc>>,
}

impl Paper {
    /// A bare record; the title is whitespace-normalised.
    pub fn new(title: &str, source: PaperSource) -> Self {
        Self {
            title: normalize_ws(title),
            abstract_text: String::new(),
            authors: Vec::new(),
            year: None,
            venue: None,
            source,
            url: None,
            pdf_url: None,
            doi: None,
            paper_id: None,
            citation_count: None,
            is_open_access: false,
            search_query: None,
            relevance_score: None,
            relevance_reason: None,
            category: None,
            downloaded: false,
            local_pdf_path: None,
            downloaded_at: None,
        }
    }

    /// Identity key used by deduplication.
    pub fn title_key(&self) -> String {
        normalize_ws(&self.title).to_lowercase()
    }
}

/// Collapse runs of whitespace (including newlines from XML feeds) to one space.
pub fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drop empty strings and normalise an optional field.
pub fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(normalize_ws).filter(|s| !s.is_empty())
}

// ── Findings ──────────────────────────────────────────────────────────────────

/// Structured extraction from one paper's abstract. Always carries its source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub paper_title: String,
    pub paper_year: Option<i32>,
    pub empathy_definition: Option<String>,
    pub behaviors_identified: Option<TextOrList>,
    pub measurement_methods: Option<TextOrList>,
    pub existing_scales: Option<TextOrList>,
    /// Whatever else the model returned.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BehaviorModality {
    Verbal,
    Nonverbal,
    Adaptive,
}

impl BehaviorModality {
    pub const ALL: [BehaviorModality; 3] =
        [BehaviorModality::Verbal, BehaviorModality::Nonverbal, BehaviorModality::Adaptive];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcedDefinition {
    pub definition: String,
    pub source: String,
    pub year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementApproach {
    pub method: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistingScale {
    pub scale: String,
    pub source: String,
}

/// Findings arranged for the scale-design report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizedResults {
    pub empathy_definitions: Vec<SourcedDefinition>,
    pub empathic_behaviors: BTreeMap<BehaviorModality, Vec<String>>,
    pub measurement_approaches: Vec<MeasurementApproach>,
    pub existing_scales: Vec<ExistingScale>,
}

impl Default for OrganizedResults {
    fn default() -> Self {
        Self {
            empathy_definitions: Vec::new(),
            empathic_behaviors: BehaviorModality::ALL.iter().map(|m| (*m, Vec::new())).collect(),
            measurement_approaches: Vec::new(),
            existing_scales: Vec::new(),
        }
    }
}

impl OrganizedResults {
    pub fn is_empty(&self) -> bool {
        self.empathy_definitions.is_empty()
            && self.empathic_behaviors.values().all(Vec::is_empty)
            && self.measurement_approaches.is_empty()
            && self.existing_scales.is_empty()
    }

    pub fn behaviors(&self, modality: BehaviorModality) -> &[String] {
        self.empathic_behaviors
            .get(&modality)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

// ── Run output ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTally {
    pub attempted: usize,
    pub downloaded: usize,
}

/// Everything one pipeline run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub job_id: Uuid,
    pub run_id: String,
    pub search_queries: Vec<String>,
    /// Records returned by providers, before deduplication.
    pub raw_papers_found: usize,
    /// Unique papers after deduplication.
    pub total_papers_found: usize,
    pub screened_papers: usize,
    pub extracted_findings: usize,
    pub downloads_attempted: usize,
    pub pdfs_downloaded: usize,
    pub per_category: BTreeMap<Category, CategoryTally>,
    pub organized_findings: OrganizedResults,
    pub downloaded_papers: Vec<Paper>,
    pub all_findings: Vec<Finding>,
    pub errors: Vec<String>,
    pub duration_ms: u64,
}
