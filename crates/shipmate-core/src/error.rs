//! Core error types

use thiserror::Error;

/// How a failure should be treated by the enclosing batch
///
/// Every error surfaced by shipmate maps onto exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The remote resource is absent (404); stops the batch
    NotFound,
    /// The remote rejected a malformed reference (422)
    Invalid,
    /// Any other remote status or transport failure; always fatal, never retried
    TransientOrUnexpected,
    /// Missing or malformed configuration or precondition; fatal before any network call
    LocalValidation,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FailureKind::NotFound => "not found",
            FailureKind::Invalid => "invalid",
            FailureKind::TransientOrUnexpected => "unexpected",
            FailureKind::LocalValidation => "local validation",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Config file not found: {path}")]
    ConfigNotFound { path: String },

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Invalid config in section [{section}]: {message}")]
    InvalidSection { section: String, message: String },

    #[error("Invalid settings: {message}")]
    InvalidSettings { message: String },

    #[error("Unknown tag type '{value}' (expected 'calver' or 'semver')")]
    UnknownTagType { value: String },

    #[error("Unknown container registry '{value}' (expected 'dockerhub' or 'harbor')")]
    UnknownRegistry { value: String },

    #[error("Repository {name} is semver tagged but has no semver set")]
    MissingSemver { name: String },

    #[error("Repository {name} already has {field} set to {value}")]
    AlreadySet {
        name: String,
        field: &'static str,
        value: String,
    },

    #[error("Manifest not found: {path}")]
    ManifestNotFound { path: String },

    #[error("Manifest {path} is not a YAML mapping")]
    InvalidManifest { path: String },

    #[error("Failed to parse manifest: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Classify this error for batch handling
    pub fn kind(&self) -> FailureKind {
        match self {
            CoreError::Io(_) => FailureKind::TransientOrUnexpected,
            _ => FailureKind::LocalValidation,
        }
    }

    pub(crate) fn section(section: &str, message: impl Into<String>) -> Self {
        CoreError::InvalidSection {
            section: section.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
