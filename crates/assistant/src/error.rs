use std::time::Duration;
use thiserror::Error;

/// Result type for assistant operations
pub type Result<T> = std::result::Result<T, AssistantError>;

/// Failures talking to the model endpoint. Malformed model *text* is not an error here; it is
/// handled by the normalizer.
#[derive(Error, Debug)]
pub enum AssistantError {
    /// Nothing to ask
    #[error("Prompt is empty")]
    EmptyPrompt,

    /// Configuration is unusable (no endpoint, bad values)
    #[error("Invalid LLM configuration: {0}")]
    InvalidConfig(String),

    /// Endpoint could not be reached
    #[error("LLM endpoint unreachable: {0}")]
    Transport(String),

    /// Endpoint did not answer in time
    #[error("LLM endpoint timed out after {}s", .timeout.as_secs())]
    Timeout { timeout: Duration },

    /// Endpoint answered with a non-2xx status
    #[error("LLM endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// 2xx answer without `choices[0].message.content`
    #[error("Malformed completion: {0}")]
    MalformedCompletion(String),
}

impl AssistantError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyPrompt => "invalid_request",
            Self::InvalidConfig(_) => "llm_not_configured",
            Self::Transport(_) => "llm_unreachable",
            Self::Timeout { .. } => "llm_timeout",
            Self::Status { .. } => "llm_error_status",
            Self::MalformedCompletion(_) => "llm_bad_response",
        }
    }

    pub fn hint(&self) -> &'static str {
        match self {
            Self::EmptyPrompt => "Send a non-empty `prompt` field.",
            Self::InvalidConfig(_) => "Set [llm].endpoint in reqforge.toml or REQFORGE_LLM_ENDPOINT.",
            Self::Transport(_) => "Check the endpoint URL and that the model server is running.",
            Self::Timeout { .. } => "The model is slow; raise [llm].timeout_secs or lower max_tokens.",
            Self::Status { status: 401 | 403, .. } => "Check the API key (REQFORGE_LLM_API_KEY).",
            Self::Status { .. } => "Check the model name and the endpoint's error message.",
            Self::MalformedCompletion(_) => {
                "The endpoint must speak the OpenAI chat-completions format."
            }
        }
    }
}
