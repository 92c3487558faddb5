//! Structured findings extraction.
//!
//! The model is asked for a JSON object per accepted paper. Replies with no
//! parsable object yield no finding for that paper; nothing here is fatal.

use scalescout_llm::parse::extract_json_object;
use scalescout_llm::{complete_text, LlmBackend};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::models::{Finding, Paper, TextOrList};
use crate::prompts;

/// Extract findings from the first `limit` papers, in order.
pub async fn extract_findings(llm: &dyn LlmBackend, papers: &[Paper], limit: usize) -> Vec<Finding> {
    let targets = &papers[..papers.len().min(limit)];
    info!(n = targets.len(), "Extracting findings");

    let mut findings = Vec::new();
    for paper in targets {
        let prompt = prompts::extraction(&paper.title, &paper.abstract_text);
        let response = match complete_text(llm, &prompt).await {
            Ok(r) => r,
            Err(e) => {
                warn!(title = %paper.title, error = %e, "Extraction call failed");
                continue;
            }
        };
        match extract_json_object(&response) {
            Some(obj) => findings.push(Finding::from_extraction(paper, obj)),
            None => debug!(title = %paper.title, "No JSON object in extraction reply"),
        }
    }

    info!(n = findings.len(), "Findings extracted");
    findings
}

impl Finding {
    /// Attach the source paper to a parsed extraction object.
    pub fn from_extraction(paper: &Paper, mut obj: Map<String, Value>) -> Self {
        let mut take = |key: &str| obj.remove(key).and_then(text_or_list);
        let empathy_definition = take("empathy_definition").map(|d| d.joined("; "));
        let behaviors_identified = take("behaviors_identified");
        let measurement_methods = take("measurement_methods");
        let existing_scales = take("existing_scales");

        // The model may echo these back; the paper's own values win.
        obj.remove("paper_title");
        obj.remove("paper_year");

        Finding {
            paper_title: paper.title.clone(),
            paper_year: paper.year,
            empathy_definition,
            behaviors_identified,
            measurement_methods,
            existing_scales,
            extra: obj,
        }
    }
}

/// Lenient read of a model-supplied field: strings and arrays of anything
/// printable are accepted, null/empty become `None`.
fn text_or_list(v: Value) -> Option<TextOrList> {
    let value = match v {
        Value::String(s) => TextOrList::Text(s.trim().to_string()),
        Value::Array(items) => TextOrList::List(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.trim().to_string()),
                    Value::Null => None,
                    other => Some(other.to_string()),
                })
                .filter(|s| !s.is_empty())
                .collect(),
        ),
        Value::Null => return None,
        other => TextOrList::Text(other.to_string()),
    };
    (!value.is_blank()).then_some(value)
}
