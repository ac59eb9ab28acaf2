use once_cell::sync::Lazy;
use regex::Regex;

static THINK_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<think\b[^>]*>.*?</think\s*>").expect("valid think regex"));

// Reply cut off while the model was still reasoning.
static UNCLOSED_THINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<think\b[^>]*>.*\z").expect("valid think regex"));

static STRAY_THINK_CLOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</think\s*>").expect("valid think regex"));

static LEADING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\A```(?:json)?[ \t]*").expect("valid fence regex"));

static TRAILING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```\z").expect("valid fence regex"));

/// Strip reasoning blocks and the outer markdown fence from a raw model reply.
///
/// Pure and infallible: text without such markup comes back trimmed but otherwise unchanged.
pub fn sanitize(raw: &str) -> String {
    let mut text = raw.to_string();
    // Removing one tag can splice its neighbours into a new one, so run to a fixed point.
    loop {
        let next = strip_reasoning_once(&text);
        if next.len() == text.len() {
            break;
        }
        text = next;
    }

    let trimmed = text.trim();
    let unfenced = LEADING_FENCE.replace(trimmed, "");
    let unfenced = unfenced.trim_end();
    TRAILING_FENCE.replace(unfenced, "").trim().to_string()
}

fn strip_reasoning_once(text: &str) -> String {
    let without_blocks = THINK_BLOCK.replace_all(text, "");
    let without_unclosed = UNCLOSED_THINK.replace(&without_blocks, "");
    STRAY_THINK_CLOSE
        .replace_all(&without_unclosed, "")
        .into_owned()
}
