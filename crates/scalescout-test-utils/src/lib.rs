//! scalescout-test-utils: in-process doubles shared by unit and integration tests.

use async_trait::async_trait;
use scalescout_llm::{LlmBackend, LlmError, LlmRequest, LlmResponse};

type Script = dyn Fn(&str) -> Result<String, LlmError> + Send + Sync;

/// Answers each prompt with whatever the script returns for it.
pub struct ScriptedLlm {
    script: Box<Script>,
}

impl ScriptedLlm {
    pub fn new(f: impl Fn(&str) -> Result<String, LlmError> + Send + Sync + 'static) -> Self {
        Self { script: Box::new(f) }
    }

    pub fn failing() -> Self {
        Self::new(|_| Err(LlmError::Unavailable("offline".to_string())))
    }
}

#[async_trait]
impl LlmBackend for ScriptedLlm {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let prompt = req.messages.last().map(|m| m.content.as_str()).unwrap_or("");
        Ok(LlmResponse {
            content: (self.script)(prompt)?,
            model: "scripted".to_string(),
            prompt_tokens: 0,
            completion_tokens: 0,
        })
    }

    fn model_id(&self) -> &str { "scripted" }
    fn is_local(&self) -> bool { true }
}
