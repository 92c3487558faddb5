//! LLM relevance screening.
//!
//! One model call per candidate. A paper survives with a score of at least
//! the threshold; anything the model fails to say is defaulted rather than
//! treated as an error.

use scalescout_llm::parse::{labeled_field, labeled_int};
use scalescout_llm::{complete_text, LlmBackend};
use tracing::{debug, info, warn};

use crate::models::Paper;
use crate::prompts;

pub const DEFAULT_SCORE: u8 = 3;
pub const DEFAULT_REASON: &str = "No reason provided";

#[derive(Debug, Clone)]
pub struct ScreeningConfig {
    /// Only this many candidates (from the front of the list) are scored.
    pub limit: usize,
    /// Abstract characters included in the prompt.
    pub abstract_chars: usize,
    /// Minimum accepted score, inclusive.
    pub threshold: u8,
    pub focus: String,
}

impl Default for ScreeningConfig {
    fn default() -> Self {
        Self {
            limit: 80,
            abstract_chars: 500,
            threshold: 3,
            focus: "definitions".to_string(),
        }
    }
}

/// Score candidates and keep those at or above the threshold, in input order.
pub async fn screen_papers(
    llm: &dyn LlmBackend,
    papers: Vec<Paper>,
    cfg: &ScreeningConfig,
) -> Vec<Paper> {
    let candidates = papers.len().min(cfg.limit);
    info!(candidates, focus = %cfg.focus, "Screening papers for relevance");

    let mut accepted = Vec::new();
    for (i, mut paper) in papers.into_iter().take(cfg.limit).enumerate() {
        let abstract_snippet = truncate_chars(&paper.abstract_text, cfg.abstract_chars);
        let prompt = prompts::relevance_screening(&paper.title, abstract_snippet, &cfg.focus);

        let response = match complete_text(llm, &prompt).await {
            Ok(r) => r,
            Err(e) => {
                warn!(title = %paper.title, error = %e, "Screening call failed, skipping paper");
                continue;
            }
        };

        let (score, reason) = parse_screening(&response);
        debug!(title = %paper.title, score, "Scored [{}/{}]", i + 1, candidates);
        if score >= cfg.threshold {
            paper.relevance_score = Some(score);
            paper.relevance_reason = Some(reason);
            accepted.push(paper);
        }
    }

    info!(accepted = accepted.len(), candidates, "Screening complete");
    accepted
}

/// Score and reason from a `SCORE: n` / `REASON: ...` reply. The score is
/// clamped to 1..=5.
pub fn parse_screening(response: &str) -> (u8, String) {
    let score = labeled_int(response, "SCORE")
        .map(|s| s.clamp(1, 5) as u8)
        .unwrap_or(DEFAULT_SCORE);
    let reason = labeled_field(response, "REASON")
        .and_then(|r| r.lines().next().map(|l| l.trim().to_string()))
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| DEFAULT_REASON.to_string());
    (score, reason)
}

/// The first `max` characters of `s`, never splitting a code point.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
