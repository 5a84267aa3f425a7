//! Error types for release flows

use shipmate_chart::ChartError;
use shipmate_core::{CoreError, FailureKind};
use shipmate_host::HostError;
use thiserror::Error;

/// Release flow errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Operator declined to {action}")]
    Declined { action: String },

    #[error("Need a tag or a time to find workflows to monitor")]
    NoSelector,

    #[error("A non-empty tag is required")]
    EmptyTag,

    #[error("No repositories configured")]
    NoRepositories,

    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    Chart(#[from] ChartError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl PipelineError {
    /// Classify this error for batch handling
    pub fn kind(&self) -> FailureKind {
        match self {
            PipelineError::Declined { .. }
            | PipelineError::NoSelector
            | PipelineError::EmptyTag
            | PipelineError::NoRepositories => FailureKind::LocalValidation,
            PipelineError::Host(e) => e.kind(),
            PipelineError::Chart(e) => e.kind(),
            PipelineError::Core(e) => e.kind(),
        }
    }

    pub(crate) fn declined(action: impl Into<String>) -> Self {
        PipelineError::Declined {
            action: action.into(),
        }
    }
}

/// Result type for release flows
pub type Result<T> = std::result::Result<T, PipelineError>;
