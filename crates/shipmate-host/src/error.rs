//! Error types for host operations

use shipmate_core::{CoreError, EndpointKind, FailureKind, ResponseClass, classify};
use thiserror::Error;

/// Host API and registry errors
#[derive(Debug, Error)]
pub enum HostError {
    // ============ Lookup Errors ============
    #[error("Branch {branch} not found in repository {repo}")]
    BranchNotFound { repo: String, branch: String },

    #[error("Commit {commit} not found in repository {repo}")]
    CommitNotFound { repo: String, commit: String },

    #[error("Tag {tag} not found in repository {repo}")]
    TagNotFound { repo: String, tag: String },

    #[error("Image {repo}:{tag} not found in {registry} ({url})")]
    ContainerNotFound {
        repo: String,
        tag: String,
        registry: String,
        url: String,
    },

    // ============ Precondition Errors ============
    #[error("A GitHub token is required to {action}")]
    MissingToken { action: String },

    #[error("Token does not look like a GitHub personal access token")]
    InvalidToken,

    #[error("Repository {repo} has no resolved commit")]
    MissingCommit { repo: String },

    #[error("Repository {repo} has no generated tag")]
    MissingTag { repo: String },

    #[error("Repository {repo} has no old-tag to retag from")]
    MissingOldTag { repo: String },

    // ============ Response Errors ============
    #[error("{endpoint} request to {url} failed with HTTP {status}")]
    UnexpectedStatus {
        endpoint: EndpointKind,
        url: String,
        status: u16,
    },

    #[error("Unexpected response from {url}: {message}")]
    MalformedResponse { url: String, message: String },

    // ============ Transport Errors ============
    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Request timeout: {message}")]
    Timeout { message: String },

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl HostError {
    /// Classify this error for batch handling
    pub fn kind(&self) -> FailureKind {
        match self {
            HostError::BranchNotFound { .. }
            | HostError::CommitNotFound { .. }
            | HostError::TagNotFound { .. }
            | HostError::ContainerNotFound { .. } => FailureKind::NotFound,
            HostError::MissingToken { .. }
            | HostError::InvalidToken
            | HostError::MissingCommit { .. }
            | HostError::MissingTag { .. }
            | HostError::MissingOldTag { .. } => FailureKind::LocalValidation,
            HostError::UnexpectedStatus {
                endpoint, status, ..
            } => match classify(*endpoint, *status) {
                ResponseClass::NotFound => FailureKind::NotFound,
                ResponseClass::Invalid => FailureKind::Invalid,
                _ => FailureKind::TransientOrUnexpected,
            },
            HostError::MalformedResponse { .. }
            | HostError::Network { .. }
            | HostError::Timeout { .. } => FailureKind::TransientOrUnexpected,
            HostError::Core(e) => e.kind(),
        }
    }

    pub(crate) fn status(endpoint: EndpointKind, url: &str, status: u16) -> Self {
        HostError::UnexpectedStatus {
            endpoint,
            url: url.to_string(),
            status,
        }
    }

    pub(crate) fn malformed(url: &str, message: impl std::fmt::Display) -> Self {
        HostError::MalformedResponse {
            url: url.to_string(),
            message: message.to_string(),
        }
    }
}

/// Result type for host operations
pub type Result<T> = std::result::Result<T, HostError>;

impl From<reqwest::Error> for HostError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            HostError::Timeout {
                message: e.to_string(),
            }
        } else if e.is_connect() {
            HostError::Network {
                message: format!("Connection failed: {}", e),
            }
        } else {
            HostError::Network {
                message: e.to_string(),
            }
        }
    }
}

impl From<url::ParseError> for HostError {
    fn from(e: url::ParseError) -> Self {
        HostError::Network {
            message: format!("Invalid URL: {}", e),
        }
    }
}
