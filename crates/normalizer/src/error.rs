use thiserror::Error;

/// Every repair strategy was tried and none produced parseable JSON.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("no JSON object could be recovered: {message}")]
pub struct ParseFailure {
    /// Message of the last parser error seen in the chain.
    pub message: String,
}

impl ParseFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
