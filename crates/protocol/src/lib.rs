//! Wire types shared by the reqforge server, the CLI and the browser UI.
//!
//! Field names are camelCase on the wire because the UI consumes them directly.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const API_VERSION: &str = "1";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ErrorEnvelope {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorEnvelope {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Body of every non-2xx API response.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub success: bool,
    pub error: ErrorEnvelope,
}

impl From<ErrorEnvelope> for ApiError {
    fn from(error: ErrorEnvelope) -> Self {
        Self {
            success: false,
            error,
        }
    }
}

/// An HTTP request the relay should send on the browser's behalf.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ProxyRequest {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl ProxyRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Replace a header regardless of the case it was stored under.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|key, _| !key.eq_ignore_ascii_case(name));
        self.headers.insert(name.to_string(), value.into());
    }
}

/// What the target answered, as relayed back to the UI.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProxyResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    /// Round-trip time in milliseconds.
    pub time: u64,
    /// Body size in bytes.
    pub size: u64,
}

/// Which instruction set accompanies a prompt to the model.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AiMode {
    /// Find injection points in a request.
    Discovery,
    /// Generate attack payloads.
    Payloads,
    /// Injection points and payloads in one answer.
    Combined,
    /// Judge whether a tested payload worked.
    Analysis,
    /// Anything else.
    General,
}

impl AiMode {
    pub const ALL: [AiMode; 5] = [
        Self::Discovery,
        Self::Payloads,
        Self::Combined,
        Self::Analysis,
        Self::General,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Discovery => "discovery",
            Self::Payloads => "payloads",
            Self::Combined => "combined",
            Self::Analysis => "analysis",
            Self::General => "general",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(raw))
    }
}

impl fmt::Display for AiMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request/response text the user attached to a prompt.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct AiContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

impl AiContext {
    pub fn is_empty(&self) -> bool {
        self.request.as_deref().map_or(true, |r| r.trim().is_empty())
            && self.response.as_deref().map_or(true, |r| r.trim().is_empty())
    }
}

/// Per-request model settings from the UI; unset fields fall back to server config.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LlmOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AiRequest {
    pub prompt: String,
    /// Explicit mode; inferred from the prompt and context when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<AiMode>,
    #[serde(default)]
    pub context: AiContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<LlmOverrides>,
}

/// Successful AI round trip: normalized `data` plus the model's original text.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AiReply<T> {
    pub success: bool,
    pub data: T,
    pub raw_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<AiMode>,
}

/// Body of `POST /api/normalize`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct NormalizeRequest {
    pub text: String,
}

pub fn serialize_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(Into::into)
}

pub fn serialize_json_pretty<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn proxy_response_uses_camel_case() {
        let response = ProxyResponse {
            status: 404,
            status_text: "Not Found".to_string(),
            headers: BTreeMap::new(),
            body: String::new(),
            time: 12,
            size: 0,
        };
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"status": 404, "statusText": "Not Found", "headers": {}, "body": "", "time": 12, "size": 0})
        );
    }

    #[test]
    fn ai_request_defaults_optional_fields() {
        let request: AiRequest = serde_json::from_str(r#"{"prompt": "find params"}"#).unwrap();
        assert_eq!(request.mode, None);
        assert!(request.context.is_empty());
        assert_eq!(request.config, None);

        let request: AiRequest = serde_json::from_value(json!({
            "prompt": "did it work?",
            "mode": "analysis",
            "context": {"response": "HTTP/1.1 500"},
            "config": {"apiKey": "k", "maxTokens": 512}
        }))
        .unwrap();
        assert_eq!(request.mode, Some(AiMode::Analysis));
        let config = request.config.unwrap();
        assert_eq!(config.api_key.as_deref(), Some("k"));
        assert_eq!(config.max_tokens, Some(512));
    }

    #[test]
    fn ai_reply_omits_missing_warning() {
        let reply = AiReply {
            success: true,
            data: json!({"type": "freeText", "message": "hi"}),
            raw_message: "hi".to_string(),
            warning: None,
            mode: None,
        };
        assert_eq!(
            serde_json::to_value(&reply).unwrap(),
            json!({"success": true, "data": {"type": "freeText", "message": "hi"}, "rawMessage": "hi"})
        );
    }

    #[test]
    fn header_helpers_ignore_case() {
        let mut request = ProxyRequest::new("GET", "http://example.test/");
        request.set_header("content-type", "text/plain");
        request.set_header("Content-Type", "application/json");
        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.header("CONTENT-TYPE"), Some("application/json"));
    }

    #[test]
    fn mode_parse_is_case_insensitive() {
        assert_eq!(AiMode::parse("Analysis"), Some(AiMode::Analysis));
        assert_eq!(AiMode::parse("nope"), None);
    }
}
