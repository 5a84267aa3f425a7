//! CLI error type with exit code handling

use miette::Diagnostic;
use shipmate_core::{CoreError, FailureKind};
use shipmate_host::HostError;
use shipmate_pipeline::PipelineError;
use thiserror::Error;

use crate::exit_codes;

/// Errors surfaced to the operator
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// Configuration file missing or invalid
    #[error("Configuration error: {message}")]
    #[diagnostic(code(shipmate::cli::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Arguments or local state that failed validation
    #[error("{message}")]
    #[diagnostic(code(shipmate::cli::validation))]
    Validation {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// The host reported a missing branch, commit, tag or image
    #[error("{message}")]
    #[diagnostic(code(shipmate::cli::not_found))]
    NotFound {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// The host rejected a request
    #[error("Rejected: {message}")]
    #[diagnostic(code(shipmate::cli::rejected))]
    Rejected { message: String },

    /// Network failure or unexpected response
    #[error("Remote error: {message}")]
    #[diagnostic(
        code(shipmate::cli::remote),
        help("Re-run with --debug to log every request")
    )]
    Remote { message: String },

    /// Runtime setup failure
    #[error("Internal error: {message}")]
    #[diagnostic(code(shipmate::cli::internal))]
    Internal { message: String },
}

impl CliError {
    /// Exit code for this error
    pub fn exit_code(&self) -> i32 {
        exit_codes::ERROR
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>, help: Option<String>) -> Self {
        Self::Validation {
            message: message.into(),
            help,
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        let help = match &err {
            CoreError::ConfigNotFound { .. } => {
                Some("Pass --config or set SHIPMATE_CONFIG".to_string())
            }
            CoreError::UnknownTagType { .. } => Some("Use calver or semver".to_string()),
            CoreError::UnknownRegistry { .. } => Some("Use dockerhub or harbor".to_string()),
            CoreError::MissingSemver { .. } => {
                Some("Add a semver key to the repository section".to_string())
            }
            _ => None,
        };
        match err {
            CoreError::Io(e) => CliError::internal(e.to_string()),
            other => CliError::Config {
                message: other.to_string(),
                help,
            },
        }
    }
}

impl From<HostError> for CliError {
    fn from(err: HostError) -> Self {
        PipelineError::from(err).into()
    }
}

impl From<PipelineError> for CliError {
    fn from(err: PipelineError) -> Self {
        let message = err.to_string();
        match err.kind() {
            FailureKind::LocalValidation => {
                let help = match &err {
                    PipelineError::Host(HostError::MissingToken { .. })
                    | PipelineError::Host(HostError::InvalidToken) => {
                        Some("Pass --token or set GITHUB_TOKEN".to_string())
                    }
                    PipelineError::Host(HostError::MissingOldTag { .. }) => {
                        Some("Add an old-tag key to every repository section".to_string())
                    }
                    PipelineError::NoSelector => {
                        Some("Pass --tag or --time to select workflow runs".to_string())
                    }
                    PipelineError::Declined { .. } => Some("Nothing was changed".to_string()),
                    _ => None,
                };
                CliError::Validation { message, help }
            }
            FailureKind::NotFound => CliError::NotFound {
                message,
                help: Some("Check the repository section and your token's access".to_string()),
            },
            FailureKind::Invalid => CliError::Rejected { message },
            FailureKind::TransientOrUnexpected => CliError::Remote { message },
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
