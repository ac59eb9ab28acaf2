use reqforge_protocol::LlmOverrides;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Model endpoint settings, loaded from the `[llm]` table of `reqforge.toml`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    /// OpenAI-compatible chat-completions URL
    pub endpoint: String,

    /// Sent as `Authorization: Bearer <key>` when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    pub model: String,

    pub max_tokens: u32,

    /// Fixed sampling temperature; the mode's temperature is used when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    pub timeout_secs: u64,

    /// Character cap for each attached request/response section
    pub context_char_budget: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 2000,
            temperature: None,
            timeout_secs: 120,
            context_char_budget: 12_000,
        }
    }
}

impl LlmConfig {
    /// Layer per-request overrides on top of this config. Blank strings do not override.
    pub fn with_overrides(&self, overrides: &LlmOverrides) -> Self {
        let mut merged = self.clone();
        if let Some(endpoint) = non_blank(overrides.endpoint.as_deref()) {
            merged.endpoint = endpoint.to_string();
        }
        if let Some(key) = non_blank(overrides.api_key.as_deref()) {
            merged.api_key = Some(key.to_string());
        }
        if let Some(model) = non_blank(overrides.model.as_deref()) {
            merged.model = model.to_string();
        }
        if let Some(temperature) = overrides.temperature {
            merged.temperature = Some(temperature);
        }
        if let Some(max_tokens) = overrides.max_tokens {
            merged.max_tokens = max_tokens;
        }
        merged
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.endpoint.trim().is_empty() {
            return Err("endpoint is not set".to_string());
        }
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(format!(
                "endpoint must be an http(s) URL, got '{}'",
                self.endpoint
            ));
        }
        if self.model.trim().is_empty() {
            return Err("model is not set".to_string());
        }
        if self.max_tokens == 0 {
            return Err("max_tokens must be > 0".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be > 0".to_string());
        }
        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(format!("temperature {temperature} is outside 0.0..=2.0"));
            }
        }
        Ok(())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
