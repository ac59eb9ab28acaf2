use crate::prompts;
use reqforge_protocol::{AiContext, AiMode};

/// Instruction set and sampling temperature for one [`AiMode`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeProfile {
    pub mode: AiMode,
    pub instructions: &'static str,
    pub temperature: f32,
}

impl ModeProfile {
    #[must_use]
    pub const fn new(mode: AiMode, instructions: &'static str, temperature: f32) -> Self {
        Self {
            mode,
            instructions,
            temperature,
        }
    }

    #[must_use]
    pub fn for_mode(mode: AiMode) -> Self {
        match mode {
            // Precise, repeatable answers for locating parameters and judging results
            AiMode::Discovery => Self::new(mode, prompts::DISCOVERY, 0.3),
            AiMode::Payloads => Self::new(mode, prompts::PAYLOADS, 0.8),
            AiMode::Combined => Self::new(mode, prompts::COMBINED, 0.5),
            AiMode::Analysis => Self::new(mode, prompts::ANALYSIS, 0.2),
            AiMode::General => Self::new(mode, prompts::GENERAL, 0.7),
        }
    }
}

const ANALYSIS_WORDS: [&str; 6] = [
    "analy",
    "success",
    "verdict",
    "vulnerable",
    "worked",
    "bypass",
];

const PAYLOAD_WORDS: [&str; 4] = ["payload", "generate", "fuzz", "wordlist"];

const DISCOVERY_WORDS: [&str; 5] = ["injection", "parameter", "param", "inject", "entry point"];

pub struct ModeSelector;

impl ModeSelector {
    /// An explicit mode always wins over inference.
    #[must_use]
    pub fn resolve(explicit: Option<AiMode>, prompt: &str, context: &AiContext) -> AiMode {
        explicit.unwrap_or_else(|| Self::infer(prompt, context))
    }

    /// Keyword routing for callers that did not tag the prompt.
    #[must_use]
    pub fn infer(prompt: &str, context: &AiContext) -> AiMode {
        let q = prompt.to_lowercase();
        let mentions = |words: &[&str]| words.iter().any(|needle| q.contains(needle));

        let has_response = context
            .response
            .as_deref()
            .is_some_and(|response| !response.trim().is_empty());
        if has_response && mentions(&ANALYSIS_WORDS) {
            return AiMode::Analysis;
        }

        match (mentions(&DISCOVERY_WORDS), mentions(&PAYLOAD_WORDS)) {
            (true, true) => AiMode::Combined,
            (false, true) => AiMode::Payloads,
            (true, false) => AiMode::Discovery,
            (false, false) => AiMode::General,
        }
    }
}
