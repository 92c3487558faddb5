//! Multi-source searcher.
//!
//! Every query goes to every enabled provider, one call after another. Calls
//! to the same provider are spaced by `60 / requests_per_minute` seconds;
//! only the part of that interval not already spent elsewhere is slept.
//! Results for query *i* are complete before query *i+1* starts, and
//! deduplication runs once over everything at the end.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use scalescout_common::SandboxClient;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::dedup::dedup_by_title;
use crate::models::{Paper, PaperSource};
use crate::sources::{build_source, min_interval, LiteratureSource, SourceSettings};

pub const DEFAULT_MAX_PER_SOURCE: usize = 20;

/// What a full fan-out produced.
#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    /// Unique papers, first-seen order.
    pub papers: Vec<Paper>,
    /// Records returned by providers before deduplication.
    pub raw_count: usize,
    /// One line per failed provider call.
    pub errors: Vec<String>,
}

/// Provider availability as reported by [`MultiSourceSearcher::statuses`].
#[derive(Debug, Clone, Serialize)]
pub struct SourceStatus {
    pub name: String,
    pub enabled: bool,
    pub healthy: bool,
    pub requests_per_minute: u32,
}

pub struct MultiSourceSearcher {
    sources: Vec<Arc<dyn LiteratureSource>>,
    max_per_source: usize,
    last_call: Mutex<HashMap<PaperSource, Instant>>,
}

impl MultiSourceSearcher {
    pub fn new(max_per_source: usize) -> Self {
        Self {
            sources: Vec::new(),
            max_per_source,
            last_call: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_source(mut self, source: Arc<dyn LiteratureSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Searcher over the given providers, each built from shared settings.
    pub fn from_settings(
        enabled: &[PaperSource],
        client: &SandboxClient,
        settings: &SourceSettings,
        max_per_source: usize,
    ) -> Self {
        enabled.iter().fold(Self::new(max_per_source), |s, src| {
            s.with_source(build_source(*src, client.clone(), settings))
        })
    }

    pub fn enabled(&self) -> Vec<PaperSource> {
        self.sources.iter().map(|s| s.source()).collect()
    }

    pub fn max_per_source(&self) -> usize {
        self.max_per_source
    }

    /// Run every query against every provider and deduplicate the lot.
    pub async fn search_all(&self, queries: &[String]) -> SearchOutcome {
        let mut raw: Vec<Paper> = Vec::new();
        let mut errors = Vec::new();

        for (i, query) in queries.iter().enumerate() {
            info!(query = %query, "Searching [{}/{}]", i + 1, queries.len());
            for source in &self.sources {
                self.throttle(source.as_ref()).await;
                match source.search(query, self.max_per_source).await {
                    Ok(papers) => {
                        info!(source = %source.source(), n = papers.len(), "Papers retrieved");
                        raw.extend(papers);
                    }
                    Err(e) => {
                        let msg = format!("{} search failed for '{}': {e}", source.source(), query);
                        warn!("{}", &msg);
                        errors.push(msg);
                    }
                }
            }
            info!(total = raw.len(), "Running total after query {}", i + 1);
        }

        let raw_count = raw.len();
        let papers = dedup_by_title(raw);
        info!(raw = raw_count, unique = papers.len(), "Search complete");
        SearchOutcome { papers, raw_count, errors }
    }

    /// Probe every known provider; disabled ones are listed but not contacted.
    pub async fn statuses(&self) -> Vec<SourceStatus> {
        let mut out = Vec::with_capacity(PaperSource::ALL.len());
        for kind in PaperSource::ALL {
            let status = match self.sources.iter().find(|s| s.source() == kind) {
                Some(source) => {
                    self.throttle(source.as_ref()).await;
                    SourceStatus {
                        name: kind.to_string(),
                        enabled: true,
                        healthy: source.health_check().await,
                        requests_per_minute: source.requests_per_minute(),
                    }
                }
                None => SourceStatus {
                    name: kind.to_string(),
                    enabled: false,
                    healthy: false,
                    requests_per_minute: 0,
                },
            };
            out.push(status);
        }
        out
    }

    /// Sleep until the provider's interval since its last call has elapsed,
    /// then stamp the new call.
    async fn throttle(&self, source: &dyn LiteratureSource) {
        let interval = min_interval(source.requests_per_minute());
        let wait = {
            let last = self.last_call.lock().unwrap_or_else(|e| e.into_inner());
            last.get(&source.source())
                .map(|t| interval.saturating_sub(t.elapsed()))
                .unwrap_or_default()
        };
        if !wait.is_zero() {
            debug!(source = %source.source(), wait_ms = wait.as_millis() as u64, "Rate limiting");
            tokio::time::sleep(wait).await;
        }
        self.last_call
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(source.source(), Instant::now());
    }
}
