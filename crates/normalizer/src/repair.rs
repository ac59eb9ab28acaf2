use crate::error::ParseFailure;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::error::Category;
use serde_json::Value;
use std::borrow::Cow;

static INLINE_REQUEST_EXAMPLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:GET|POST|PUT|PATCH|DELETE|HEAD|OPTIONS)\s*\([^)]*\)")
        .expect("valid inline example regex")
});

// Only these arrays are long enough in practice to get cut off by the token limit.
static TRUNCATABLE_ARRAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""(?:payloads|evidence)"\s*:\s*\["#).expect("valid array marker regex")
});

const INLINE_EXAMPLE_PLACEHOLDER: &str = "[request example]";

/// A repair strategy that had to run before the text parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repair {
    /// `\'` sequences replaced with `'`.
    EscapeCleanup,
    /// `GET(...)`-style request examples inside strings collapsed to a placeholder.
    InlineExample,
    /// Missing `]`/`}` appended to a reply that was cut off.
    Truncation,
    /// Only the first complete object was kept; trailing text was dropped.
    BalancedExtraction,
}

impl Repair {
    pub fn warning(self) -> &'static str {
        match self {
            Self::EscapeCleanup | Self::InlineExample => "auto-repaired due to formatting issues.",
            Self::Truncation => {
                "response was truncated but repaired; some data may be incomplete."
            }
            Self::BalancedExtraction => "extracted first complete JSON object from response.",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Repaired {
    pub value: Value,
    /// `None` when the text parsed directly.
    pub repair: Option<Repair>,
}

/// Rewrites the working text, or returns `None` when it does not apply.
///
/// The second argument is the error from the initial direct parse.
type Strategy = fn(&str, &serde_json::Error) -> Option<String>;

const STRATEGIES: [(Repair, Strategy); 4] = [
    (Repair::EscapeCleanup, unescape_single_quotes),
    (Repair::InlineExample, collapse_inline_examples),
    (Repair::Truncation, close_truncated),
    (Repair::BalancedExtraction, first_balanced_object),
];

/// Parse `candidate` as JSON, applying repair strategies in order until one succeeds.
///
/// Strategies are cumulative: each one sees the text as rewritten by the strategies before it.
pub fn parse_with_repair(candidate: &str) -> Result<Repaired, ParseFailure> {
    let initial_err = match serde_json::from_str::<Value>(candidate) {
        Ok(value) => {
            return Ok(Repaired {
                value,
                repair: None,
            })
        }
        Err(err) => err,
    };

    let mut working: Cow<'_, str> = Cow::Borrowed(candidate);
    let mut last_err = initial_err.to_string();

    for (repair, strategy) in STRATEGIES {
        let Some(next) = strategy(&working, &initial_err) else {
            continue;
        };
        match serde_json::from_str::<Value>(&next) {
            Ok(value) => {
                log::debug!("JSON recovered by {repair:?} (initial error: {initial_err})");
                return Ok(Repaired {
                    value,
                    repair: Some(repair),
                });
            }
            Err(err) => {
                log::trace!("{repair:?} did not help: {err}");
                last_err = err.to_string();
                working = Cow::Owned(next);
            }
        }
    }

    Err(ParseFailure::new(last_err))
}

/// Replace `\'` with `'`, leaving an escaped backslash followed by a quote (`\\'`) alone.
fn unescape_single_quotes(text: &str, _: &serde_json::Error) -> Option<String> {
    if !text.contains("\\'") {
        return None;
    }
    let mut out = String::with_capacity(text.len());
    let mut changed = false;
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\'') => {
                out.push('\'');
                changed = true;
            }
            Some(escaped) => {
                out.push('\\');
                out.push(escaped);
            }
            None => out.push('\\'),
        }
    }
    changed.then_some(out)
}

fn collapse_inline_examples(text: &str, initial_err: &serde_json::Error) -> Option<String> {
    if initial_err.classify() != Category::Syntax || !INLINE_REQUEST_EXAMPLE.is_match(text) {
        return None;
    }
    Some(
        INLINE_REQUEST_EXAMPLE
            .replace_all(text, INLINE_EXAMPLE_PLACEHOLDER)
            .into_owned(),
    )
}

fn close_truncated(text: &str, _: &serde_json::Error) -> Option<String> {
    if !TRUNCATABLE_ARRAY.is_match(text) {
        return None;
    }

    let scan = scan_structure(text);
    if scan.is_closed() {
        return None;
    }

    let mut repaired = text.trim_end().to_string();
    if scan.in_string {
        if scan.escaped {
            repaired.pop();
        }
        repaired.push('"');
    } else {
        let kept = repaired.trim_end_matches(|c: char| c == ',' || c.is_whitespace()).len();
        repaired.truncate(kept);
    }
    repaired.extend(scan.open.iter().rev());
    Some(repaired)
}

fn first_balanced_object(text: &str, _: &serde_json::Error) -> Option<String> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let object = &text[start..start + offset + 1];
                    return (object != text.trim()).then(|| object.to_string());
                }
            }
            _ => {}
        }
    }
    None
}

pub(crate) struct StructureScan {
    /// Closers still owed, outermost first.
    open: Vec<char>,
    in_string: bool,
    escaped: bool,
}

impl StructureScan {
    /// No brackets left open and not inside a string.
    pub(crate) fn is_closed(&self) -> bool {
        self.open.is_empty() && !self.in_string
    }
}

/// String-aware bracket scan of `text` from its start.
pub(crate) fn scan_structure(text: &str) -> StructureScan {
    let mut open = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for ch in text.chars() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => open.push('}'),
            '[' => open.push(']'),
            '}' | ']' => {
                if open.last() == Some(&ch) {
                    open.pop();
                }
            }
            _ => {}
        }
    }

    StructureScan {
        open,
        in_string,
        escaped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn valid_json_parses_directly() {
        let repaired = parse_with_repair(r#"{"payloads": ["a"]}"#).unwrap();
        assert_eq!(repaired.repair, None);
        assert_eq!(repaired.value, json!({"payloads": ["a"]}));
    }

    #[test]
    fn escaped_single_quotes_are_repaired() {
        let repaired = parse_with_repair(r#"{"explanation": "test \'quoted\' text"}"#).unwrap();
        assert_eq!(repaired.repair, Some(Repair::EscapeCleanup));
        assert_eq!(repaired.value["explanation"], "test 'quoted' text");
    }

    #[test]
    fn inline_request_examples_are_collapsed() {
        let text = r#"{"explanation": "Send GET("/api/user?id=1") to confirm", "payloads": ["1'"]}"#;
        let repaired = parse_with_repair(text).unwrap();
        assert_eq!(repaired.repair, Some(Repair::InlineExample));
        assert_eq!(
            repaired.value["explanation"],
            "Send [request example] to confirm"
        );
        assert_eq!(repaired.value["payloads"], json!(["1'"]));
    }

    #[test]
    fn truncated_payloads_are_closed() {
        let repaired = parse_with_repair(r#"{"payloads": ["a","b""#).unwrap();
        assert_eq!(repaired.repair, Some(Repair::Truncation));
        assert_eq!(repaired.value, json!({"payloads": ["a", "b"]}));
    }

    #[test]
    fn truncation_inside_a_string_and_after_a_comma() {
        let repaired = parse_with_repair(r#"{"evidence": ["status 500", "stack tr"#).unwrap();
        assert_eq!(repaired.value["evidence"], json!(["status 500", "stack tr"]));

        let repaired = parse_with_repair(r#"{"payloads": [{"v": "a"}, "#).unwrap();
        assert_eq!(repaired.value, json!({"payloads": [{"v": "a"}]}));
    }

    #[test]
    fn truncation_repair_ignores_brackets_inside_strings() {
        let repaired = parse_with_repair(r#"{"payloads": ["]}", "{["#).unwrap();
        assert_eq!(repaired.value, json!({"payloads": ["]}", "{["]}));
    }

    #[test]
    fn truncation_needs_a_known_array_marker() {
        let err = parse_with_repair(r#"{"injectionPoints": [{"name": "id""#).unwrap_err();
        assert!(!err.message.is_empty());
    }

    #[test]
    fn first_object_is_extracted_from_trailing_garbage() {
        let repaired = parse_with_repair(r#"{"verdict": "success"} {"verdict": "failure"}"#).unwrap();
        assert_eq!(repaired.repair, Some(Repair::BalancedExtraction));
        assert_eq!(repaired.value, json!({"verdict": "success"}));
    }

    #[test]
    fn repairs_compose() {
        // Needs the escape cleanup before truncation repair can succeed.
        let repaired = parse_with_repair(r#"{"payloads": ["it\'s", "b"#).unwrap();
        assert_eq!(repaired.repair, Some(Repair::Truncation));
        assert_eq!(repaired.value, json!({"payloads": ["it's", "b"]}));
    }

    #[test]
    fn escaped_backslash_before_quote_is_left_alone() {
        let repaired = parse_with_repair(r#"{"payloads": ["C:\\'x", "it\'s"]}"#).unwrap();
        assert_eq!(repaired.repair, Some(Repair::EscapeCleanup));
        assert_eq!(repaired.value["payloads"], json!(["C:\\'x", "it's"]));
    }

    #[test]
    fn truncated_payloads_after_nested_objects_are_closed() {
        let text = r#"{"injectionPoints":[{"name":"id","location":"query","risk":"HIGH","reason":"numeric"}],"payloads":["1'","1 OR 1=1","1 AND SLEE"#;
        let repaired = parse_with_repair(text).unwrap();
        assert_eq!(repaired.repair, Some(Repair::Truncation));
        assert_eq!(
            repaired.value["payloads"],
            json!(["1'", "1 OR 1=1", "1 AND SLEE"])
        );
        assert_eq!(repaired.value["injectionPoints"][0]["name"], "id");
    }

    #[test]
    fn exhausted_chain_reports_last_error() {
        let err = parse_with_repair("hello world, not json").unwrap_err();
        assert!(err.message.contains("expected value"), "{}", err.message);
    }
}
