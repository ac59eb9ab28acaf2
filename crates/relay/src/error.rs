use std::time::Duration;
use thiserror::Error;

/// Result type for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;

/// Errors surfaced to the UI when a relayed request cannot be completed.
#[derive(Error, Debug)]
pub enum RelayError {
    /// The request itself is malformed (method, URL, headers, injection target)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// DNS resolution failed for the target host
    #[error("Host not found: {host}")]
    HostNotFound { host: String },

    /// Nothing is listening on the target port
    #[error("Connection refused by {host}")]
    ConnectionRefused { host: String },

    /// The target did not answer in time
    #[error("Request timed out after {}s", .timeout.as_secs())]
    Timeout { timeout: Duration },

    /// Any other transport failure
    #[error("Request failed: {0}")]
    RequestFailed(String),
}

impl RelayError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Stable machine-readable code used in error envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::HostNotFound { .. } => "host_not_found",
            Self::ConnectionRefused { .. } => "connection_refused",
            Self::Timeout { .. } => "timeout",
            Self::RequestFailed(_) => "request_failed",
        }
    }

    pub fn hint(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => {
                "Check the method, the URL (http:// or https://) and header names."
            }
            Self::HostNotFound { .. } => "Check the hostname for typos and that it resolves from the server.",
            Self::ConnectionRefused { .. } => "Check that the target service is running and the port is correct.",
            Self::Timeout { .. } => "The target may be slow or filtering traffic; retry or raise the proxy timeout.",
            Self::RequestFailed(_) => "Inspect the message for TLS or protocol errors.",
        }
    }

    pub(crate) fn from_transport(err: &reqwest::Error, host: &str, timeout: Duration) -> Self {
        if err.is_timeout() {
            return Self::Timeout { timeout };
        }

        let mut messages = Vec::new();
        let mut refused = false;
        let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
        while let Some(current) = source {
            if let Some(io) = current.downcast_ref::<std::io::Error>() {
                refused |= io.kind() == std::io::ErrorKind::ConnectionRefused;
            }
            messages.push(current.to_string());
            source = current.source();
        }
        let chain = messages.join(": ");
        let lowered = chain.to_ascii_lowercase();

        if refused || lowered.contains("connection refused") {
            return Self::ConnectionRefused {
                host: host.to_string(),
            };
        }
        if [
            "dns error",
            "failed to lookup address",
            "name or service not known",
            "no such host",
            "nodename nor servname",
        ]
        .iter()
        .any(|needle| lowered.contains(needle))
        {
            return Self::HostNotFound {
                host: host.to_string(),
            };
        }
        Self::RequestFailed(chain)
    }
}
