//! Backend construction from configuration.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backend::{
    AnthropicBackend, LlmBackend, LlmError, OpenAiCompatibleBackend, OPENAI_BASE_URL,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    OpenAi,
    OpenAiCompatible,
    Ollama,
    Anthropic,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::OpenAi           => "openai",
            BackendKind::OpenAiCompatible => "openai_compatible",
            BackendKind::Ollama           => "ollama",
            BackendKind::Anthropic        => "anthropic",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

/// Build the one backend a run talks to.
pub fn build_backend(cfg: &BackendConfig) -> Result<Arc<dyn LlmBackend>, LlmError> {
    let key = cfg.api_key.clone().filter(|k| !k.trim().is_empty());

    let backend: Arc<dyn LlmBackend> = match cfg.kind {
        BackendKind::OpenAi => {
            let key = key.ok_or_else(|| missing_key(cfg.kind))?;
            let base_url = cfg.base_url.clone().unwrap_or_else(|| OPENAI_BASE_URL.to_string());
            Arc::new(
                OpenAiCompatibleBackend::new(base_url, &cfg.model, Some(key))
                    .with_sampling(cfg.temperature, cfg.max_tokens)
                    .with_timeout(cfg.timeout),
            )
        }
        BackendKind::OpenAiCompatible | BackendKind::Ollama => {
            let default_url = if cfg.kind == BackendKind::Ollama {
                "http://localhost:11434"
            } else {
                "http://localhost:1234"
            };
            let base_url = cfg.base_url.clone().unwrap_or_else(|| default_url.to_string());
            Arc::new(
                OpenAiCompatibleBackend::new(base_url, &cfg.model, key)
                    .with_sampling(cfg.temperature, cfg.max_tokens)
                    .with_timeout(cfg.timeout),
            )
        }
        BackendKind::Anthropic => {
            let key = key.ok_or_else(|| missing_key(cfg.kind))?;
            let mut b = AnthropicBackend::new(key, &cfg.model)
                .with_sampling(cfg.temperature, cfg.max_tokens)
                .with_timeout(cfg.timeout);
            if let Some(ref url) = cfg.base_url {
                b = b.with_base_url(url);
            }
            Arc::new(b)
        }
    };

    tracing::info!(
        backend = cfg.kind.as_str(),
        model = backend.model_id(),
        is_local = backend.is_local(),
        "LLM backend ready"
    );
    Ok(backend)
}

fn missing_key(kind: BackendKind) -> LlmError {
    LlmError::Unavailable(format!("{} backend requires an API key", kind.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(kind: BackendKind, api_key: Option<&str>) -> BackendConfig {
        BackendConfig {
            kind,
            model: "test-model".to_string(),
            api_key: api_key.map(String::from),
            base_url: None,
            temperature: 0.2,
            max_tokens: 512,
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_openai_without_key_is_unavailable() {
        assert!(matches!(
            build_backend(&cfg(BackendKind::OpenAi, Some("  "))),
            Err(LlmError::Unavailable(_))
        ));
    }

    #[test]
    fn test_ollama_needs_no_key_and_is_local() {
        let b = build_backend(&cfg(BackendKind::Ollama, None)).unwrap();
        assert!(b.is_local());
        assert_eq!(b.model_id(), "test-model");
    }

    #[tokio::test]
    async fn test_openai_honours_base_url_and_sampling() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "model": "test-model",
                "max_tokens": 512,
            })))
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"content":"ok"}}]}"#)
            .create_async()
            .await;

        let mut c = cfg(BackendKind::OpenAi, Some("sk-test"));
        c.base_url = Some(server.url());
        let b = build_backend(&c).unwrap();
        assert_eq!(crate::complete_text(b.as_ref(), "hi").await.unwrap(), "ok");
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_anthropic_sends_configured_temperature() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("POST", "/v1/messages")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "max_tokens": 512,
                "temperature": 0.5,
            })))
            .with_status(200)
            .with_body(r#"{"model":"test-model","content":[{"type":"text","text":"ok"}]}"#)
            .create_async()
            .await;

        let mut c = cfg(BackendKind::Anthropic, Some("sk-ant"));
        c.base_url = Some(server.url());
        c.temperature = 0.5;
        let b = build_backend(&c).unwrap();
        assert_eq!(crate::complete_text(b.as_ref(), "hi").await.unwrap(), "ok");
        m.assert_async().await;
    }

    #[test]
    fn test_kind_deserializes_snake_case() {
        let k: BackendKind = serde_json::from_str("\"openai_compatible\"").unwrap();
        assert_eq!(k, BackendKind::OpenAiCompatible);
    }
}
