//! Error types for chart publishing

use shipmate_core::{CoreError, FailureKind};
use thiserror::Error;

/// Chart release errors
#[derive(Debug, Error)]
pub enum ChartError {
    #[error("Invalid chart version '{version}': {message}")]
    InvalidChartVersion { version: String, message: String },

    #[error("Failed to run `{command}`: {message}")]
    CommandSpawn { command: String, message: String },

    #[error("`{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("No chart archive found in {dir}")]
    ArchiveNotFound { dir: String },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChartError {
    /// Classify this error for batch handling
    pub fn kind(&self) -> FailureKind {
        match self {
            ChartError::InvalidChartVersion { .. } => FailureKind::LocalValidation,
            ChartError::Core(e) => e.kind(),
            _ => FailureKind::TransientOrUnexpected,
        }
    }
}

/// Result type for chart operations
pub type Result<T> = std::result::Result<T, ChartError>;
