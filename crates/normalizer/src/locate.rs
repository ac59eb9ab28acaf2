use crate::repair::scan_structure;
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

static FENCED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)```(?:json)?[ \t]*(.*?)```").expect("valid fence regex"));

// A brace that opens a JSON object rather than a prose placeholder like `{id}`.
static OBJECT_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\{\s*["}]"#).expect("valid object regex"));

static AI_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\A\s*(?:```[ \t]*(?:json)?|json\b)\s*:?\s*").expect("valid prefix regex")
});

/// Find the substring of a sanitized reply most likely to be a single JSON object.
///
/// The result starts with `{`. Text after the last `}` is dropped only when everything up to that
/// brace is balanced; a reply cut off inside an array or object keeps its tail for the repair
/// chain. When the text contains no `{` at all the trimmed input is returned unchanged.
pub fn locate(sanitized: &str) -> String {
    let trimmed = sanitized.trim();

    let candidate = match FENCED_BLOCK.captures(trimmed).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => trimmed,
    };
    let candidate: Cow<'_, str> = AI_PREFIX.replace(candidate, "");

    let Some(start) = OBJECT_START
        .find(&candidate)
        .map(|m| m.start())
        .or_else(|| candidate.find('{'))
    else {
        return trimmed.to_string();
    };
    let span = &candidate[start..];
    let end = match span.rfind('}') {
        Some(last) if scan_structure(&span[..=last]).is_closed() => start + last + 1,
        _ => candidate.len(),
    };

    if start > 0 {
        log::debug!(
            "Trimmed {start} chars before JSON object: {:?}",
            preview(&candidate[..start])
        );
    }
    if end < candidate.len() {
        log::debug!(
            "Trimmed {} chars after JSON object: {:?}",
            candidate.len() - end,
            preview(&candidate[end..])
        );
    }

    candidate[start..end].trim_end().to_string()
}

fn preview(text: &str) -> String {
    const MAX_PREVIEW_CHARS: usize = 80;
    let mut out: String = text.chars().take(MAX_PREVIEW_CHARS).collect();
    if text.chars().count() > MAX_PREVIEW_CHARS {
        out.push('…');
    }
    out
}
