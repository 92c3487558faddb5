//! Shared doubles for the integration tests.

#![allow(dead_code, unused_imports)]

use scalescout_literature::ResearchContext;

pub use scalescout_test_utils::ScriptedLlm;

pub fn cobot_context() -> ResearchContext {
    serde_json::from_value(serde_json::json!({
        "assessment_context": "Collaborative robot assisting workers on an assembly line",
        "robot_platform": "UR5e with a tablet face",
        "interaction_modalities": ["speech", "gestures"],
        "assessment_goals": ["perceived empathy", "trust"]
    }))
    .unwrap()
}

/// Semantic Scholar search body for the given `(title, pdf_url)` pairs.
pub fn s2_body(papers: &[(&str, Option<String>)]) -> String {
    let data: Vec<serde_json::Value> = papers
        .iter()
        .enumerate()
        .map(|(i, (title, pdf))| {
            serde_json::json!({
                "paperId": format!("s2-{i}"),
                "title": title,
                "abstract": format!("Abstract of {title}."),
                "authors": [{ "name": "A. Author" }],
                "year": 2020 + i as i32,
                "venue": "HRI",
                "openAccessPdf": pdf.as_ref().map(|u| serde_json::json!({ "url": u })),
            })
        })
        .collect();
    serde_json::json!({ "total": data.len(), "data": data }).to_string()
}
