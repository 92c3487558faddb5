//! scalescout-literature: Literature discovery & synthesis pipeline.
//!
//! Stages, in the order the orchestrator runs them:
//! - Query generation from the research context
//! - Multi-source search (Semantic Scholar, arXiv, PubMed, CrossRef, OpenAlex)
//! - Title deduplication
//! - LLM relevance screening
//! - Structured findings extraction
//! - Categorized PDF download
//! - Organization of findings into the scale-design taxonomy

pub mod models;
pub mod prompts;
pub mod queries;
pub mod sources;
pub mod search;
pub mod dedup;
pub mod screening;
pub mod extraction;
pub mod download;
pub mod organize;
pub mod pipeline;
pub mod summary;

pub use download::{CategorizedDownloader, DownloadReport};
pub use models::{
    BehaviorModality, Category, Finding, OrganizedResults, Paper, PaperSource, PipelineResult,
    ResearchContext,
};
pub use pipeline::{Pipeline, PipelineConfig, PipelineProgress, RunContext};
pub use screening::ScreeningConfig;
pub use search::{MultiSourceSearcher, SearchOutcome, SourceStatus};
pub use sources::{LiteratureSource, SourceSettings};
pub use summary::write_summary;
