//! Aggregation of findings into the scale-design taxonomy. Pure, no I/O.

use tracing::debug;

use crate::models::{
    BehaviorModality, ExistingScale, Finding, MeasurementApproach, OrganizedResults,
    SourcedDefinition,
};

/// Ordered keyword rules; the first rule with a matching keyword wins and
/// anything unmatched is adaptive. Matching is by lowercase substring, so
/// "nonverbal" hits the verbal rule first.
const BEHAVIOR_RULES: &[(BehaviorModality, &[&str])] = &[
    (BehaviorModality::Verbal, &["speech", "verbal", "language", "words"]),
    (BehaviorModality::Nonverbal, &["gesture", "gaze", "expression", "face"]),
];

/// Assign one behavior description to exactly one modality.
pub fn classify_behavior(text: &str) -> BehaviorModality {
    let lower = text.to_lowercase();
    BEHAVIOR_RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(modality, _)| *modality)
        .unwrap_or(BehaviorModality::Adaptive)
}

pub fn organize_findings(findings: &[Finding]) -> OrganizedResults {
    let mut out = OrganizedResults::default();

    for f in findings {
        if let Some(def) = f.empathy_definition.as_deref().filter(|d| !d.trim().is_empty()) {
            out.empathy_definitions.push(SourcedDefinition {
                definition: def.to_string(),
                source: f.paper_title.clone(),
                year: f.paper_year,
            });
        }

        if let Some(behaviors) = f.behaviors_identified.as_ref().filter(|b| !b.is_blank()) {
            let text = behaviors.joined(", ");
            let modality = classify_behavior(&text);
            out.empathic_behaviors.entry(modality).or_default().push(text);
        }

        if let Some(methods) = f.measurement_methods.as_ref().filter(|m| !m.is_blank()) {
            out.measurement_approaches.push(MeasurementApproach {
                method: methods.joined(", "),
                source: f.paper_title.clone(),
            });
        }

        if let Some(scales) = f.existing_scales.as_ref().filter(|s| !s.is_blank()) {
            out.existing_scales.push(ExistingScale {
                scale: scales.joined(", "),
                source: f.paper_title.clone(),
            });
        }
    }

    debug!(
        definitions = out.empathy_definitions.len(),
        measurement = out.measurement_approaches.len(),
        scales = out.existing_scales.len(),
        "Findings organized"
    );
    out
}
