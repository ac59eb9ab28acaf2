//! System instructions per mode, and assembly of the chat messages sent to the model.

use reqforge_protocol::AiContext;
use serde::{Deserialize, Serialize};

const JSON_RULES: &str = "Reply with a single JSON object and nothing else: no markdown fences, \
no prose before or after it. Escape double quotes inside strings. Never put raw HTTP request \
examples such as GET(...) inside string values.";

pub const DISCOVERY: &str = "You are a web security assistant helping an authorized tester \
find injection points in an HTTP request. Identify every parameter worth testing: query \
parameters, body fields, headers, cookies and path segments. Reply with JSON of the shape \
{\"explanation\": string, \"injectionPoints\": [{\"name\": string, \"location\": \
\"query\"|\"body\"|\"header\"|\"cookie\"|\"path\", \"risk\": \"high\"|\"medium\"|\"low\", \
\"reason\": string}]}.";

pub const PAYLOADS: &str = "You are a web security assistant helping an authorized tester \
generate test payloads. Produce 10 to 15 varied payloads suited to the target and the \
vulnerability class the tester asks about. Reply with JSON of the shape \
{\"explanation\": string, \"payloads\": [string]}.";

pub const COMBINED: &str = "You are a web security assistant helping an authorized tester. \
First identify the injection points in the HTTP request, then propose 10 to 15 payloads for \
them. Reply with JSON of the shape {\"explanation\": string, \"injectionPoints\": \
[{\"name\": string, \"location\": \"query\"|\"body\"|\"header\"|\"cookie\"|\"path\", \
\"risk\": \"high\"|\"medium\"|\"low\", \"reason\": string}], \"payloads\": [string]}.";

pub const ANALYSIS: &str = "You are a web security assistant reviewing the result of a \
payload test for an authorized tester. Decide from the HTTP response whether the payload \
worked. Reply with JSON of the shape {\"explanation\": string, \"verdict\": \
\"success\"|\"failure\"|\"suspicious\", \"confidence\": number between 0 and 100, \
\"evidence\": [string]} where evidence quotes the parts of the response that support the \
verdict.";

pub const GENERAL: &str = "You are a web security assistant helping an authorized tester \
understand HTTP traffic. Answer the question directly. Reply with JSON of the shape \
{\"explanation\": string}.";

/// One chat-completions message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// System message with the mode instructions, then the user prompt with any attached
/// request/response, each section capped at `budget` characters.
pub fn build_messages(
    instructions: &str,
    prompt: &str,
    context: &AiContext,
    budget: usize,
) -> Vec<ChatMessage> {
    let mut user = prompt.trim().to_string();
    let sections = [
        ("HTTP Request", context.request.as_deref()),
        ("HTTP Response", context.response.as_deref()),
    ];
    for (title, text) in sections {
        let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
            continue;
        };
        user.push_str("\n\n### ");
        user.push_str(title);
        user.push('\n');
        user.push_str(&truncate_chars(text, budget));
    }

    vec![
        ChatMessage::system(format!("{instructions}\n\n{JSON_RULES}")),
        ChatMessage::user(user),
    ]
}

/// Cut `text` to `budget` characters, noting how many were dropped.
pub fn truncate_chars(text: &str, budget: usize) -> String {
    let total = text.chars().count();
    if total <= budget {
        return text.to_string();
    }
    let kept: String = text.chars().take(budget).collect();
    format!("{kept}\n[truncated {} chars]", total - budget)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn prompt_without_context_is_sent_alone() {
        let messages = build_messages(GENERAL, "  what is CSRF? ", &AiContext::default(), 100);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert!(messages[0].content.starts_with(GENERAL));
        assert_eq!(messages[1], ChatMessage::user("what is CSRF?"));
    }

    #[test]
    fn context_sections_are_appended_in_order() {
        let context = AiContext {
            request: Some("GET /?q=1 HTTP/1.1".to_string()),
            response: Some("HTTP/1.1 200 OK".to_string()),
        };
        let messages = build_messages(DISCOVERY, "find params", &context, 100);
        assert_eq!(
            messages[1].content,
            "find params\n\n### HTTP Request\nGET /?q=1 HTTP/1.1\n\n### HTTP Response\nHTTP/1.1 200 OK"
        );
    }

    #[test]
    fn long_sections_are_truncated_on_char_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo\n[truncated 6 chars]");
        assert_eq!(truncate_chars("short", 5), "short");

        let context = AiContext {
            request: None,
            response: Some("x".repeat(50)),
        };
        let messages = build_messages(ANALYSIS, "did it work", &context, 10);
        assert!(messages[1].content.ends_with("[truncated 40 chars]"));
        assert!(!messages[1].content.contains("### HTTP Request"));
    }
}
