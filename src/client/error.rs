//! Error taxonomy for the GitHub client

use compact_str::CompactString;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level failure: DNS, connection, TLS.
    #[error("Network error: {0}")]
    Transport(reqwest::Error),

    #[error("Request timed out")]
    Timeout,

    /// Non-2xx response with the server-provided message.
    #[error("GitHub API error ({status}): {message}")]
    Api { status: u16, message: CompactString },

    #[error("Authentication failed; GitHub rejected the token")]
    Authentication,

    #[error("Not found: {resource}")]
    NotFound { resource: CompactString },

    #[error("Failed to parse response from {endpoint}: {message}")]
    JsonParse {
        endpoint: CompactString,
        message: String,
    },

    #[error("Invalid configuration: {field}: {message}")]
    ConfigValidation { field: String, message: String },
}

impl ClientError {
    /// Create a configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation { field: field.into(), message: message.into() }
    }

    /// Create a JSON parse error
    pub fn json_parse(endpoint: impl Into<CompactString>, source: impl std::fmt::Display) -> Self {
        Self::JsonParse { endpoint: endpoint.into(), message: source.to_string() }
    }

    /// Split reqwest failures into timeouts and other transport errors.
    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() { Self::Timeout } else { Self::Transport(e) }
    }
}
