//! Configuration for the GitHub client

use std::time::Duration;

use compact_str::CompactString;

use super::error::{ClientError, Result};

/// Public GitHub REST API endpoint.
pub const GITHUB_API_URL: &str = "https://api.github.com";

/// Pinned REST API version, sent with every request.
pub const GITHUB_API_VERSION: &str = "2022-11-28";

/// Main configuration for the GitHub client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base URL
    pub base_url: CompactString,
    /// Bearer token
    pub token: CompactString,
    /// Request configuration
    pub request: RequestConfig,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// Fixed timeout applied to every request
    pub timeout: Duration,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(30) }
    }
}

impl ClientConfig {
    /// Configuration against the public GitHub API.
    pub fn new(token: impl Into<CompactString>) -> Self {
        Self {
            base_url: GITHUB_API_URL.into(),
            token: token.into(),
            request: RequestConfig::default(),
        }
    }

    /// Point the client at a different API endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<CompactString>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(ClientError::config_validation(
                "base_url",
                "Base URL cannot be empty",
            ));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ClientError::config_validation(
                "base_url",
                "Base URL must start with http:// or https://",
            ));
        }

        if url::Url::parse(&self.base_url).is_err() {
            return Err(ClientError::config_validation(
                "base_url",
                "Base URL is not a valid URL",
            ));
        }

        if self.token.trim().is_empty() {
            return Err(ClientError::config_validation(
                "token",
                "Token cannot be empty",
            ));
        }

        if self.request.timeout.is_zero() {
            return Err(ClientError::config_validation(
                "timeout",
                "Timeout must be greater than zero",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_configuration_validates() {
        assert!(ClientConfig::new("ghp_sometesttoken").validate().is_ok());
    }

    #[test]
    fn rejects_empty_token() {
        let config = ClientConfig::new("  ");
        assert!(matches!(
            config.validate(),
            Err(ClientError::ConfigValidation { field, .. }) if field == "token"
        ));
    }

    #[test]
    fn rejects_non_http_base_url() {
        let config = ClientConfig::new("ghp_sometesttoken").with_base_url("ftp://example.com");
        assert!(matches!(
            config.validate(),
            Err(ClientError::ConfigValidation { field, .. }) if field == "base_url"
        ));
    }

    #[test]
    fn rejects_zero_timeout() {
        let mut config = ClientConfig::new("ghp_sometesttoken");
        config.request.timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }
}
