//! Search-query generation from the research context.

use std::sync::OnceLock;

use regex::Regex;
use scalescout_llm::{complete_text, LlmBackend};
use tracing::{info, warn};

use crate::models::ResearchContext;
use crate::prompts;

pub const MIN_QUERIES: usize = 5;
pub const MAX_QUERIES: usize = 6;
const MIN_QUERY_CHARS: usize = 10;
const META_PREFIXES: &[&str] = &["Query", "Format", "Generate"];

/// Ask the model for search queries. Always yields between
/// [`MIN_QUERIES`] and [`MAX_QUERIES`] entries.
pub async fn generate_queries(llm: &dyn LlmBackend, ctx: &ResearchContext) -> Vec<String> {
    let prompt = prompts::query_generation(ctx);
    let queries = match complete_text(llm, &prompt).await {
        Ok(text) => parse_query_lines(&text),
        Err(e) => {
            warn!(error = %e, "Query generation failed, using fallback queries");
            prompts::FALLBACK_QUERIES.iter().map(|q| q.to_string()).collect()
        }
    };
    let queries = pad_and_truncate(queries);
    info!(n = queries.len(), "Search queries ready");
    queries
}

/// Pull one query per line out of a model response.
pub fn parse_query_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(clean_line)
        .filter(|line| line.chars().count() >= MIN_QUERY_CHARS)
        .filter(|line| !META_PREFIXES.iter().any(|p| line.starts_with(p)))
        .collect()
}

fn clean_line(line: &str) -> String {
    let stripped = enumeration_re().replace(line.trim(), "");
    stripped
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_string()
}

fn enumeration_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // "1. ", "2) ", "- ", "* ", "• "
    RE.get_or_init(|| Regex::new(r"^(?:\d+\s*[.)]|[-*•])\s*").unwrap())
}

fn pad_and_truncate(mut queries: Vec<String>) -> Vec<String> {
    while queries.len() < MIN_QUERIES {
        queries.push(prompts::GENERIC_QUERY.to_string());
    }
    queries.truncate(MAX_QUERIES);
    queries
}

#[cfg(test)]
mod tests {
    use super::*;
    use scalescout_test_utils::ScriptedLlm;

    fn ctx() -> ResearchContext {
        ResearchContext {
            assessment_context: "Cobot handing parts to a line worker".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_service_failure_uses_fallbacks_padded_to_five() {
        let q = generate_queries(&ScriptedLlm::failing(), &ctx()).await;
        assert_eq!(q.len(), MIN_QUERIES);
        assert_eq!(&q[..3], &prompts::FALLBACK_QUERIES.map(String::from)[..]);
        assert_eq!(q[3], prompts::GENERIC_QUERY);
    }

    #[tokio::test]
    async fn test_query_count_bounds_hold_for_any_reply() {
        let long = "robot empathy definition scale\n".repeat(10);
        for reply in ["", "ok", long.as_str()] {
            let reply = reply.to_string();
            let llm = ScriptedLlm::new(move |_| Ok(reply.clone()));
            let q = generate_queries(&llm, &ctx()).await;
            assert!((MIN_QUERIES..=MAX_QUERIES).contains(&q.len()));
        }
    }

    #[test]
    fn test_parse_strips_numbering_and_quotes() {
        let text = "1. \"robot empathy definition\"\n\
                    2) 'empathic gestures social robots'\n\
                    - perceived empathy questionnaire HRI\n\
                    short\n\
                    Query 5: should be dropped\n\
                    Format: one per line";
        let q = parse_query_lines(text);
        assert_eq!(
            q,
            vec![
                "robot empathy definition",
                "empathic gestures social robots",
                "perceived empathy questionnaire HRI",
            ]
        );
    }

    #[test]
    fn test_ten_char_lines_are_kept() {
        assert_eq!(parse_query_lines("abcdefghij\nabcdefghi"), vec!["abcdefghij"]);
    }

    #[test]
    fn test_pad_to_minimum() {
        let q = pad_and_truncate(vec!["robot empathy scale".to_string()]);
        assert_eq!(q.len(), MIN_QUERIES);
        assert_eq!(q[0], "robot empathy scale");
        assert!(q[1..].iter().all(|s| s == prompts::GENERIC_QUERY));
    }

    #[test]
    fn test_truncate_to_maximum() {
        let many: Vec<String> = (0..12).map(|i| format!("query number {i}")).collect();
        let q = pad_and_truncate(many);
        assert_eq!(q.len(), MAX_QUERIES);
        assert_eq!(q[5], "query number 5");
    }
}
