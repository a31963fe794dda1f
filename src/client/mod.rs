//! GitHub client modules
//!
//! A thin authenticated transport to the GitHub REST API carrying only the
//! operations the probe needs, split into focused components.

pub mod api;
pub mod config;
pub mod error;

// Re-export main types for convenience
pub use api::GithubApi;
pub use config::ClientConfig;
pub use error::ClientError;

pub type Result<T> = std::result::Result<T, ClientError>;
