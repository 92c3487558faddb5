//! Configuration loading for scalescout.
//! Reads scalescout.toml from the current directory or the path in SCALESCOUT_CONFIG.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use scalescout_common::SandboxClient;
use scalescout_literature::{PaperSource, PipelineConfig, SourceSettings};
use scalescout_llm::{BackendConfig, BackendKind};
use serde::{Deserialize, Serialize};

pub const CONFIG_ENV: &str = "SCALESCOUT_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "scalescout.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

// ── [llm] ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_backend")]
    pub backend: BackendKind,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub base_url: Option<String>,
    /// Empty means SCALESCOUT_<BACKEND>_API_KEY is consulted.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Per-completion timeout, separate from the provider HTTP timeout.
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_backend()     -> BackendKind { BackendKind::OpenAi }
fn default_model()       -> String { "gpt-4".to_string() }
fn default_temperature() -> f32 { 0.3 }
fn default_max_tokens()  -> u32 { 2000 }
fn default_llm_timeout() -> u64 { 120 }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            model: default_model(),
            base_url: None,
            api_key: String::new(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

impl LlmConfig {
    pub fn api_key_env(&self) -> String {
        format!("SCALESCOUT_{}_API_KEY", self.backend.as_str().to_uppercase())
    }

    /// Configured key, else the backend's environment variable.
    pub fn resolved_api_key(&self) -> Option<String> {
        if !self.api_key.trim().is_empty() {
            return Some(self.api_key.clone());
        }
        std::env::var(self.api_key_env()).ok().filter(|k| !k.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig {
            kind: self.backend,
            model: self.model.clone(),
            api_key: self.resolved_api_key(),
            base_url: self.base_url.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout: self.timeout(),
        }
    }
}

// ── [sources] ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_enabled_sources")]
    pub enabled: Vec<String>,
    #[serde(default = "default_max_per_source")]
    pub max_per_source: usize,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub pubmed_api_key: Option<String>,
    #[serde(default)]
    pub semantic_scholar_api_key: Option<String>,
    /// Keyed by source name, e.g. `arxiv = 10`.
    #[serde(default)]
    pub requests_per_minute: HashMap<String, u32>,
}

fn default_enabled_sources() -> Vec<String> {
    PaperSource::ALL.iter().map(|s| s.as_str().to_string()).collect()
}

fn default_max_per_source() -> usize { 20 }

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled_sources(),
            max_per_source: default_max_per_source(),
            contact_email: None,
            pubmed_api_key: None,
            semantic_scholar_api_key: None,
            requests_per_minute: HashMap::new(),
        }
    }
}

impl SourcesConfig {
    /// Enabled providers in configured order, without repeats.
    pub fn enabled_sources(&self) -> anyhow::Result<Vec<PaperSource>> {
        let mut out = Vec::new();
        for name in &self.enabled {
            let source: PaperSource = name.parse()?;
            if !out.contains(&source) {
                out.push(source);
            }
        }
        Ok(out)
    }

    pub fn settings(&self) -> anyhow::Result<SourceSettings> {
        let mut rate_overrides = HashMap::new();
        for (name, rpm) in &self.requests_per_minute {
            let source: PaperSource = name
                .parse()
                .with_context(|| format!("in [sources.requests_per_minute] key '{name}'"))?;
            rate_overrides.insert(source, *rpm);
        }

        Ok(SourceSettings {
            contact_email: self.contact_email.clone().filter(|e| !e.trim().is_empty()),
            pubmed_api_key: self.pubmed_api_key.clone().filter(|k| !k.trim().is_empty()),
            semantic_scholar_api_key: self
                .semantic_scholar_api_key
                .clone()
                .filter(|k| !k.trim().is_empty()),
            rate_overrides,
            base_url_overrides: HashMap::new(),
        })
    }
}

// ── [pipeline] ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    #[serde(default = "default_screen_limit")]
    pub screen_limit: usize,
    #[serde(default = "default_extract_limit")]
    pub extract_limit: usize,
    #[serde(default = "default_download_limit")]
    pub download_limit: usize,
    #[serde(default = "default_abstract_chars")]
    pub abstract_chars: usize,
    #[serde(default = "default_accept_threshold")]
    pub accept_threshold: u8,
    #[serde(default = "default_focus_areas")]
    pub focus_areas: Vec<String>,
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,
}

fn default_screen_limit()     -> usize { 80 }
fn default_extract_limit()    -> usize { 50 }
fn default_download_limit()   -> usize { 50 }
fn default_abstract_chars()   -> usize { 500 }
fn default_accept_threshold() -> u8 { 3 }
fn default_download_timeout() -> u64 { 60 }

fn default_focus_areas() -> Vec<String> {
    vec!["definitions".to_string(), "behaviors".to_string(), "measurement".to_string()]
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            screen_limit: default_screen_limit(),
            extract_limit: default_extract_limit(),
            download_limit: default_download_limit(),
            abstract_chars: default_abstract_chars(),
            accept_threshold: default_accept_threshold(),
            focus_areas: default_focus_areas(),
            download_timeout_secs: default_download_timeout(),
        }
    }
}

impl PipelineSettings {
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            screen_limit: self.screen_limit,
            extract_limit: self.extract_limit,
            abstract_chars: self.abstract_chars,
            accept_threshold: self.accept_threshold.clamp(1, 5),
            focus_areas: self.focus_areas.clone(),
        }
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

// ── [output] ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_runs_dir")]
    pub runs_dir: PathBuf,
}

fn default_runs_dir() -> PathBuf { PathBuf::from("./data/runs") }

impl Default for OutputConfig {
    fn default() -> Self {
        Self { runs_dir: default_runs_dir() }
    }
}

// ── [http] ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub extra_allowed_domains: Vec<String>,
}

fn default_timeout_secs() -> u64 { 30 }
fn default_user_agent()   -> String { "scalescout/0.1 (academic research)".to_string() }

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            extra_allowed_domains: Vec::new(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Allowlisted client for the bibliographic providers.
    pub fn sandbox_client(&self) -> anyhow::Result<SandboxClient> {
        let mut client = SandboxClient::with_settings(self.timeout(), &self.user_agent)?;
        for domain in &self.extra_allowed_domains {
            client.allow_domain(domain.trim());
        }
        Ok(client)
    }
}

mod tests;

impl Config {
    /// Load configuration from scalescout.toml.
    /// Checks SCALESCOUT_CONFIG first, then the current directory. A missing
    /// file yields the defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(Path::new(&path))
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using defaults (copy scalescout.example.toml to scalescout.toml to customise)"
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
