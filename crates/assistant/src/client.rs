use crate::config::LlmConfig;
use crate::error::{AssistantError, Result};
use crate::prompts::ChatMessage;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Instant;

// Enough of an error page to diagnose a bad key or model name.
const ERROR_BODY_LIMIT: usize = 500;

/// Body of an OpenAI-compatible chat-completions request.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub stream: bool,
}

#[derive(Debug, Deserialize)]
struct Completion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<CompletionMessage>,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

/// Thin client for a chat-completions endpoint. Cheap to clone; the connection pool is shared.
#[derive(Debug, Clone, Default)]
pub struct ChatClient {
    http: Client,
}

impl ChatClient {
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .build()
            .map_err(|err| AssistantError::Transport(format!("cannot build HTTP client: {err}")))?;
        Ok(Self { http })
    }

    /// Post `request` to the configured endpoint and return `choices[0].message.content`.
    pub async fn complete(&self, config: &LlmConfig, request: &ChatRequest) -> Result<String> {
        config.validate().map_err(AssistantError::invalid_config)?;

        let mut builder = self
            .http
            .post(config.endpoint.trim())
            .timeout(config.timeout())
            .json(request);
        if let Some(key) = config.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            builder = builder.bearer_auth(key.trim());
        }

        let started = Instant::now();
        let response = builder.send().await.map_err(|err| transport(err, config))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| transport(err, config))?;
        log::debug!(
            "chat completion from {} -> {} in {}ms",
            config.endpoint,
            status.as_u16(),
            started.elapsed().as_millis()
        );

        if !status.is_success() {
            return Err(AssistantError::Status {
                status: status.as_u16(),
                body: truncate(&body, ERROR_BODY_LIMIT),
            });
        }
        extract_content(&body)
    }
}

/// Pull the assistant text out of a completion body.
pub fn extract_content(body: &str) -> Result<String> {
    let completion: Completion = serde_json::from_str(body).map_err(|err| {
        AssistantError::MalformedCompletion(format!("response is not a completion object: {err}"))
    })?;
    completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .ok_or_else(|| {
            AssistantError::MalformedCompletion("missing choices[0].message.content".to_string())
        })
}

fn transport(err: reqwest::Error, config: &LlmConfig) -> AssistantError {
    if err.is_timeout() {
        AssistantError::Timeout {
            timeout: config.timeout(),
        }
    } else {
        AssistantError::Transport(format!("{}: {err}", config.endpoint))
    }
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(limit).collect();
    cut.push_str("...");
    cut
}
