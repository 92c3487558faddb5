//! Prompt templates sent to the text-understanding service.

use crate::models::ResearchContext;

/// Query used to pad short query lists.
pub const GENERIC_QUERY: &str = "robot empathy human-robot interaction";

/// Used when query generation fails outright, one per taxonomy category.
pub const FALLBACK_QUERIES: [&str; 3] = [
    "robot empathy definition",
    "empathic robot behaviors",
    "empathy measurement scale human-robot interaction",
];

pub fn query_generation(ctx: &ResearchContext) -> String {
    format!(
        r#"You are helping researchers design a psychometric scale that measures how empathic a robot appears to the people working with it.

RESEARCH CONTEXT:
- Scenario: {context}
- Robot platform: {platform}
- Interaction channels: {modalities}
- Assessment goals: {goals}

Generate 6 academic search queries that will find literature on:
1. How empathy is defined for robots and artificial agents
2. Empathic behaviors robots express (verbal, nonverbal, adaptive)
3. How perceived empathy is measured (questionnaires, scales, behavioral coding)
4. Empathy in the specific scenario and platform above

Rules:
- One query per line, no numbering, no quotes, no commentary
- 3 to 8 keywords per query, suitable for Semantic Scholar, arXiv and PubMed"#,
        context = ctx.assessment_context.trim(),
        platform = ctx.platform(),
        modalities = ctx.modalities(),
        goals = ctx.goals(),
    )
}

pub fn relevance_screening(title: &str, abstract_text: &str, focus: &str) -> String {
    format!(
        r#"Rate how useful this paper is for designing a robot empathy scale, with emphasis on: {focus}.

TITLE: {title}
ABSTRACT: {abstract_text}

Scoring guide:
5 = directly defines, operationalises or measures empathy in robots/agents
4 = studies empathic robot behavior with usable detail
3 = related human-robot interaction work with some empathy relevance
2 = tangential
1 = unrelated

Respond in exactly this format:
SCORE: <1-5>
REASON: <one sentence>"#
    )
}

pub fn extraction(title: &str, abstract_text: &str) -> String {
    format!(
        r#"Extract empathy-related findings from this paper for scale development.

TITLE: {title}
ABSTRACT: {abstract_text}

Respond with ONLY a JSON object using these keys (use null when the abstract says nothing):
{{
  "empathy_definition": "how the paper defines empathy, quoted or paraphrased",
  "behaviors_identified": ["empathic behaviors the robot/agent shows"],
  "measurement_methods": "how empathy was measured (questionnaire, scale, coding scheme)",
  "existing_scales": ["names of established scales used or cited"],
  "key_findings": "main result in one sentence"
}}"#
    )
}
