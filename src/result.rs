use std::path::PathBuf;

use compact_str::{CompactString, ToCompactString};
use thiserror::Error;

use crate::client::ClientError;

pub type Result<T> = std::result::Result<T, GhprobeError>;

#[derive(Debug, Clone, Error)]
pub enum GhprobeError {
    #[error("Invalid email address: {input}")]
    InvalidEmail { input: CompactString },

    #[error("No GitHub token provided.")]
    MissingToken,

    #[error("GitHub rejected the token; check GITHUB_TOKEN or the stored token and rerun.")]
    AuthRejected,

    #[error("Token validation failed: {0}")]
    TokenValidation(CompactString),

    #[error("Failed to save token to {path}: {message}")]
    TokenSave { path: PathBuf, message: String },

    #[error("Interrupted by user")]
    Interrupted,

    #[error("{0}")]
    General(CompactString),
}

impl GhprobeError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidEmail { .. } => 2,
            Self::Interrupted => 130,
            _ => 1,
        }
    }

    /// Create a token save error
    pub fn token_save(path: PathBuf, source: impl std::fmt::Display) -> Self {
        Self::TokenSave { path, message: source.to_string() }
    }
}

impl From<ClientError> for GhprobeError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::Authentication => GhprobeError::AuthRejected,
            other => GhprobeError::General(other.to_compact_string()),
        }
    }
}
