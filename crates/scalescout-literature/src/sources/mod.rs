//! Bibliographic provider clients.

pub mod semantic_scholar;
pub mod arxiv;
pub mod pubmed;
pub mod crossref;
pub mod openalex;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use scalescout_common::SandboxClient;

use crate::models::{Paper, PaperSource};

/// Common interface for all bibliographic providers.
#[async_trait]
pub trait LiteratureSource: Send + Sync {
    fn source(&self) -> PaperSource;

    /// Budget the provider tolerates, in requests per minute.
    fn requests_per_minute(&self) -> u32;

    /// Search for papers matching a free-text query. Records with an empty
    /// title never leave the adapter.
    async fn search(&self, query: &str, max_results: usize) -> anyhow::Result<Vec<Paper>>;

    /// Cheap liveness probe.
    async fn health_check(&self) -> bool {
        self.search("empathy", 1).await.is_ok()
    }
}

/// Spacing enforced between two calls to the same provider.
pub fn min_interval(requests_per_minute: u32) -> Duration {
    if requests_per_minute == 0 {
        Duration::ZERO
    } else {
        Duration::from_secs_f64(60.0 / requests_per_minute as f64)
    }
}

/// Knobs shared by all provider clients.
#[derive(Debug, Clone, Default)]
pub struct SourceSettings {
    /// Polite-pool contact sent to CrossRef and OpenAlex.
    pub contact_email: Option<String>,
    pub pubmed_api_key: Option<String>,
    pub semantic_scholar_api_key: Option<String>,
    pub rate_overrides: HashMap<PaperSource, u32>,
    pub base_url_overrides: HashMap<PaperSource, String>,
}

/// Build the client for one provider.
pub fn build_source(
    source: PaperSource,
    client: SandboxClient,
    settings: &SourceSettings,
) -> Arc<dyn LiteratureSource> {
    let rpm = settings.rate_overrides.get(&source).copied();
    let base = settings.base_url_overrides.get(&source).cloned();

    match source {
        PaperSource::SemanticScholar => {
            let mut c = semantic_scholar::SemanticScholarClient::new(client)
                .with_api_key(settings.semantic_scholar_api_key.clone());
            if let Some(rpm) = rpm { c = c.with_rate_limit(rpm); }
            if let Some(base) = base { c = c.with_base_url(&base); }
            Arc::new(c)
        }
        PaperSource::Arxiv => {
            let mut c = arxiv::ArxivClient::new(client);
            if let Some(rpm) = rpm { c = c.with_rate_limit(rpm); }
            if let Some(base) = base { c = c.with_base_url(&base); }
            Arc::new(c)
        }
        PaperSource::PubMed => {
            let mut c = pubmed::PubMedClient::new(client, settings.pubmed_api_key.clone());
            if let Some(rpm) = rpm { c = c.with_rate_limit(rpm); }
            if let Some(base) = base { c = c.with_base_url(&base); }
            Arc::new(c)
        }
        PaperSource::CrossRef => {
            let mut c = crossref::CrossRefClient::new(client, settings.contact_email.clone());
            if let Some(rpm) = rpm { c = c.with_rate_limit(rpm); }
            if let Some(base) = base { c = c.with_base_url(&base); }
            Arc::new(c)
        }
        PaperSource::OpenAlex => {
            let mut c = openalex::OpenAlexClient::new(client, settings.contact_email.clone());
            if let Some(rpm) = rpm { c = c.with_rate_limit(rpm); }
            if let Some(base) = base { c = c.with_base_url(&base); }
            Arc::new(c)
        }
    }
}

/// Fail on non-2xx with the provider name in the message.
pub(crate) fn ensure_success(
    source: PaperSource,
    resp: reqwest::Response,
) -> anyhow::Result<reqwest::Response> {
    let status = resp.status();
    if !status.is_success() {
        anyhow::bail!("{} returned HTTP {}", source, status);
    }
    Ok(resp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_interval_from_rpm() {
        assert_eq!(min_interval(60), Duration::from_secs(1));
        assert_eq!(min_interval(20), Duration::from_secs(3));
        assert_eq!(min_interval(0), Duration::ZERO);
    }

    #[test]
    fn test_build_source_applies_overrides() {
        let mut settings = SourceSettings::default();
        settings.rate_overrides.insert(PaperSource::Arxiv, 6);
        let src = build_source(PaperSource::Arxiv, SandboxClient::new().unwrap(), &settings);
        assert_eq!(src.source(), PaperSource::Arxiv);
        assert_eq!(src.requests_per_minute(), 6);

        let src = build_source(PaperSource::OpenAlex, SandboxClient::new().unwrap(), &settings);
        assert_eq!(src.requests_per_minute(), openalex::DEFAULT_RPM);
    }
}
