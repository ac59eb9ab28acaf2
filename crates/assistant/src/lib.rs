//! Everything between a user's question and the model's raw reply.
//!
//! ```text
//! AiRequest ─► ModeSelector ─► prompts::build_messages ─► ChatClient ─► raw reply text
//! ```
//!
//! The reply is returned untouched; turning it into a typed result is the normalizer's job.

pub mod client;
pub mod config;
pub mod error;
pub mod mode;
pub mod prompts;

pub use client::{extract_content, ChatClient, ChatRequest};
pub use config::LlmConfig;
pub use error::{AssistantError, Result};
pub use mode::{ModeProfile, ModeSelector};
pub use prompts::{build_messages, ChatMessage};

use reqforge_protocol::{AiMode, AiRequest};

/// Raw model reply together with the mode that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub mode: AiMode,
    pub content: String,
}

/// Server-wide model defaults plus a shared [`ChatClient`].
#[derive(Debug, Clone)]
pub struct Assistant {
    client: ChatClient,
    defaults: LlmConfig,
}

impl Assistant {
    pub fn new(defaults: LlmConfig) -> Result<Self> {
        Ok(Self {
            client: ChatClient::new()?,
            defaults,
        })
    }

    pub fn defaults(&self) -> &LlmConfig {
        &self.defaults
    }

    /// Resolve mode and effective config, and build the completion request, without sending it.
    pub fn prepare(&self, request: &AiRequest) -> Result<(LlmConfig, ChatRequest, AiMode)> {
        if request.prompt.trim().is_empty() {
            return Err(AssistantError::EmptyPrompt);
        }
        let config = match &request.config {
            Some(overrides) => self.defaults.with_overrides(overrides),
            None => self.defaults.clone(),
        };
        let mode = ModeSelector::resolve(request.mode, &request.prompt, &request.context);
        let profile = ModeProfile::for_mode(mode);
        let chat = ChatRequest {
            model: config.model.clone(),
            messages: build_messages(
                profile.instructions,
                &request.prompt,
                &request.context,
                config.context_char_budget,
            ),
            temperature: config.temperature.unwrap_or(profile.temperature),
            max_tokens: config.max_tokens,
            stream: false,
        };
        Ok((config, chat, mode))
    }

    pub async fn ask(&self, request: &AiRequest) -> Result<Answer> {
        let (config, chat, mode) = self.prepare(request)?;
        log::info!(
            "asking {} ({} mode, temperature {})",
            config.model,
            mode,
            chat.temperature
        );
        let content = self.client.complete(&config, &chat).await?;
        Ok(Answer { mode, content })
    }
}
