use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;
use crate::error::ScoutError;

const DEFAULT_USER_AGENT: &str = "scalescout/0.1 (academic research)";

/// An HTTP client that only talks to approved hosts.
///
/// Bibliographic providers and LLM endpoints are allowlisted by default.
/// PDF hosts are arbitrary, so the downloader builds its client with
/// [`SandboxClient::allow_all`].
#[derive(Debug, Clone)]
pub struct SandboxClient {
    client: Client,
    allowlist: HashSet<String>,
    open: bool,
}

impl SandboxClient {
    /// Creates a client with the default allowlist and a 30 s timeout.
    pub fn new() -> Result<Self, ScoutError> {
        Self::with_settings(Duration::from_secs(30), DEFAULT_USER_AGENT)
    }

    pub fn with_settings(timeout: Duration, user_agent: &str) -> Result<Self, ScoutError> {
        let domains = [
            "api.semanticscholar.org", // Semantic Scholar
            "export.arxiv.org",        // arXiv
            "arxiv.org",               // arXiv PDFs
            "eutils.ncbi.nlm.nih.gov", // PubMed
            "api.crossref.org",        // CrossRef
            "api.openalex.org",        // OpenAlex
            "api.openai.com",          // OpenAI LLMs
            "api.anthropic.com",       // Anthropic LLMs
            "localhost",               // Ollama local
            "127.0.0.1",               // Localhost alt
        ];
        let allowlist = domains.iter().map(|d| d.to_string()).collect();

        let client = ClientBuilder::new()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| ScoutError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, allowlist, open: false })
    }

    /// Appends an exact hostname to the allowlist.
    pub fn allow_domain(&mut self, domain: &str) {
        self.allowlist.insert(domain.to_string());
    }

    /// Lifts the allowlist entirely.
    pub fn allow_all(mut self) -> Self {
        self.open = true;
        self
    }

    /// Whether a URL is permitted under the current policy.
    pub fn is_allowed(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        if !matches!(parsed.scheme(), "http" | "https") {
            return false;
        }
        if self.open {
            return true;
        }
        let Some(host) = parsed.host_str() else {
            return false;
        };
        // exact match or subdomain of an allowed host
        self.allowlist
            .iter()
            .any(|allowed| host == allowed || host.ends_with(&format!(".{}", allowed)))
    }

    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, ScoutError> {
        self.check(url)?;
        Ok(self.client.get(url))
    }

    pub fn post(&self, url: &str) -> Result<reqwest::RequestBuilder, ScoutError> {
        self.check(url)?;
        Ok(self.client.post(url))
    }

    fn check(&self, url: &str) -> Result<(), ScoutError> {
        if self.is_allowed(url) {
            Ok(())
        } else {
            tracing::warn!(url, "Blocked request to host outside allowlist");
            Err(ScoutError::Security(format!(
                "domain not in allowlist for URL {}",
                url
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_allowlist_accepts_providers() {
        let c = SandboxClient::new().unwrap();
        assert!(c.is_allowed("https://api.semanticscholar.org/graph/v1/paper/search"));
        assert!(c.is_allowed("http://export.arxiv.org/api/query"));
        assert!(c.is_allowed("http://127.0.0.1:1234/works"));
    }

    #[test]
    fn test_unknown_host_blocked_until_opened() {
        let c = SandboxClient::new().unwrap();
        assert!(!c.is_allowed("https://files.example.org/paper.pdf"));
        assert!(c.get("https://files.example.org/paper.pdf").is_err());

        let c = c.allow_all();
        assert!(c.is_allowed("https://files.example.org/paper.pdf"));
    }

    #[test]
    fn test_non_http_schemes_rejected() {
        let c = SandboxClient::new().unwrap().allow_all();
        assert!(!c.is_allowed("file:///etc/passwd"));
        assert!(!c.is_allowed("not a url"));
    }

    #[test]
    fn test_subdomain_of_allowed_host() {
        let mut c = SandboxClient::new().unwrap();
        c.allow_domain("europepmc.org");
        assert!(c.is_allowed("https://www.europepmc.org/api"));
        assert!(!c.is_allowed("https://evil-europepmc.org/api"));
    }
}
