//! Analysis Error Types
//!
//! Error types shared by the analytics engine. Configuration problems are
//! raised before any commit is read; everything else aborts the running
//! analysis and is returned to the caller unchanged.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while configuring or running an analysis
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Repository location could not be opened
    #[error("Not a valid git repository: {}\n\n{message}", path.display())]
    InvalidRepository { path: PathBuf, message: String },

    /// Requested branch does not exist
    #[error("Branch '{branch}' not found in repository")]
    UnknownBranch { branch: String },

    /// Inconsistent or out of range configuration values
    #[error("Configuration problem: {0}")]
    InvalidConfiguration(String),

    /// Ignore pattern failed to compile
    #[error("Invalid ignore pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    /// Two alias records claim the same email address
    #[error("Aliases can't share an email address: {email}")]
    AliasConflict { email: String },

    /// Alias file could not be read or parsed
    #[error("Failed to load aliases from {}: {message}", path.display())]
    AliasLoad { path: PathBuf, message: String },

    /// Failure while reading repository data
    #[error("Repository error: {0}")]
    Git(#[from] git2::Error),
}

impl AnalysisError {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create a repository error for a specific path
    pub fn invalid_repository(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::InvalidRepository {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// True for errors raised while validating configuration
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidRepository { .. }
                | Self::UnknownBranch { .. }
                | Self::InvalidConfiguration(_)
                | Self::InvalidPattern { .. }
        )
    }
}

/// Result type for analysis operations
pub type AnalysisResult<T> = Result<T, AnalysisError>;
