//! Best-effort extraction of structure from free-form model output.
//!
//! Every call site that reads model text goes through these helpers. None of
//! them return errors: absence is `None` and the caller picks the default.

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Find the first balanced `{...}` span that parses as a JSON object.
///
/// Candidates are tried in order of their opening brace, so prose, code
/// fences or a stray `{` ahead of the real payload are skipped over.
pub fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    let bytes = text.as_bytes();
    for (start, _) in bytes.iter().enumerate().filter(|(_, b)| **b == b'{') {
        let Some(end) = balanced_end(bytes, start) else {
            continue;
        };
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&text[start..=end]) {
            return Some(map);
        }
    }
    None
}

/// Like [`extract_json_object`], then deserialised into `T`.
pub fn parse_structured<T: DeserializeOwned>(text: &str) -> Option<T> {
    let map = extract_json_object(text)?;
    serde_json::from_value(Value::Object(map)).ok()
}

/// Index of the `}` closing the brace at `start`, honouring JSON strings.
fn balanced_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Text following `LABEL:` up to the end of the response, trimmed.
pub fn labeled_field(text: &str, label: &str) -> Option<String> {
    let re = Regex::new(&format!(r"(?s){}:\s*(.+)", regex::escape(label))).ok()?;
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Integer following `LABEL:`.
pub fn labeled_int(text: &str, label: &str) -> Option<i64> {
    let re = Regex::new(&format!(r"{}:\s*(\d+)", regex::escape(label))).ok()?;
    re.captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_object_inside_prose_and_fences() {
        let text = "Sure! Here you go:\n```json\n{\"a\": 1, \"b\": \"x\"}\n```\nHope it helps.";
        let map = extract_json_object(text).unwrap();
        assert_eq!(map["a"], 1);
        assert_eq!(map["b"], "x");
    }

    #[test]
    fn test_braces_inside_strings_do_not_unbalance() {
        let text = r#"{"definition": "empathy {as in} \"feeling\" with", "n": 2}"#;
        let map = extract_json_object(text).unwrap();
        assert_eq!(map["n"], 2);
    }

    #[test]
    fn test_skips_unparsable_leading_braces() {
        let text = "use {curly} notation, result: {\"ok\": true}";
        let map = extract_json_object(text).unwrap();
        assert_eq!(map["ok"], true);
    }

    #[test]
    fn test_first_object_wins() {
        let text = r#"{"first": 1} and later {"second": 2}"#;
        let map = extract_json_object(text).unwrap();
        assert!(map.contains_key("first"));
        assert!(!map.contains_key("second"));
    }

    #[test]
    fn test_no_object() {
        assert!(extract_json_object("no json here").is_none());
        assert!(extract_json_object("{ unterminated").is_none());
        assert!(extract_json_object("[1, 2, 3]").is_none());
    }

    #[test]
    fn test_parse_structured_typed() {
        #[derive(Deserialize)]
        struct Score { score: u8 }
        let s: Score = parse_structured("result => {\"score\": 4}").unwrap();
        assert_eq!(s.score, 4);
        assert!(parse_structured::<Score>("{\"score\": \"high\"}").is_none());
    }

    #[test]
    fn test_labeled_fields() {
        let text = "SCORE: 4\nREASON: Directly defines robot empathy.\nCovers measurement too.";
        assert_eq!(labeled_int(text, "SCORE"), Some(4));
        let reason = labeled_field(text, "REASON").unwrap();
        assert!(reason.starts_with("Directly defines"));
        assert!(reason.ends_with("measurement too."));
        assert_eq!(labeled_int("no score", "SCORE"), None);
        assert_eq!(labeled_field("REASON:   ", "REASON"), None);
    }
}
