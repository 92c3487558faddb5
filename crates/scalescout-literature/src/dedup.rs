//! Deduplication of search results.
//!
//! Identity is the normalised title compared case-insensitively. The first
//! record seen for a title is kept; later copies are dropped even when they
//! carry richer metadata. No fuzzy matching: "Robot empathy: a review" and
//! "Robot empathy - a review" stay distinct.

use std::collections::HashSet;

use tracing::debug;

use crate::models::Paper;

/// Collapse papers sharing a title key, preserving first-seen order.
pub fn dedup_by_title(papers: Vec<Paper>) -> Vec<Paper> {
    let before = papers.len();
    let mut seen: HashSet<String> = HashSet::with_capacity(before);
    let unique: Vec<Paper> = papers
        .into_iter()
        .filter(|p| seen.insert(p.title_key()))
        .collect();
    debug!(before, after = unique.len(), "Deduplicated by title");
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaperSource;

    fn paper(title: &str, source: PaperSource) -> Paper {
        Paper::new(title, source)
    }

    #[test]
    fn test_hundred_copies_from_three_providers_collapse_to_one() {
        let sources = [PaperSource::SemanticScholar, PaperSource::Arxiv, PaperSource::PubMed];
        let papers: Vec<Paper> = (0..100)
            .map(|i| {
                let title = if i % 2 == 0 { "Robot Empathy Scale" } else { "robot  empathy SCALE" };
                paper(title, sources[i % 3])
            })
            .collect();
        let out = dedup_by_title(papers);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].source, PaperSource::SemanticScholar);
    }

    #[test]
    fn test_first_seen_wins_over_richer_duplicate() {
        let first = paper("Empathic gestures", PaperSource::CrossRef);
        let mut richer = paper("EMPATHIC GESTURES", PaperSource::OpenAlex);
        richer.abstract_text = "A long abstract".to_string();
        richer.pdf_url = Some("https://example.org/x.pdf".to_string());

        let out = dedup_by_title(vec![first, richer]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].source, PaperSource::CrossRef);
        assert!(out[0].pdf_url.is_none());
    }

    #[test]
    fn test_idempotent_and_order_preserving() {
        let papers = vec![
            paper("B title", PaperSource::Arxiv),
            paper("A title", PaperSource::Arxiv),
            paper("b TITLE", PaperSource::PubMed),
            paper("Robot empathy: a review", PaperSource::Arxiv),
            paper("Robot empathy - a review", PaperSource::Arxiv),
        ];
        let once = dedup_by_title(papers);
        let titles: Vec<&str> = once.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["B title", "A title", "Robot empathy: a review", "Robot empathy - a review"]
        );

        let twice = dedup_by_title(once.clone());
        assert_eq!(once, twice);
    }
}
