//! Repository records and their per-release state
//!
//! A [`RepoRecord`] is built once from configuration. During a release its
//! commit is resolved exactly once and its tag is generated exactly once;
//! nothing else about it changes. Optional fields (container image, old tag)
//! are narrowed per operation through the accessor methods rather than
//! separate record types for tagging, retagging and container checks.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// How a repository's release tag is built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagType {
    /// `YYYYMMDD-HHMM-{label}`
    Calver,
    /// `{semver}-{label}`
    Semver,
}

impl FromStr for TagType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "calver" => Ok(TagType::Calver),
            "semver" => Ok(TagType::Semver),
            _ => Err(CoreError::UnknownTagType {
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for TagType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TagType::Calver => write!(f, "calver"),
            TagType::Semver => write!(f, "semver"),
        }
    }
}

/// Registry that publishes a repository's container image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerRegistry {
    DockerHub,
    Harbor,
}

impl FromStr for ContainerRegistry {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "dockerhub" | "docker-hub" | "docker" => Ok(ContainerRegistry::DockerHub),
            "harbor" => Ok(ContainerRegistry::Harbor),
            _ => Err(CoreError::UnknownRegistry {
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for ContainerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContainerRegistry::DockerHub => write!(f, "dockerhub"),
            ContainerRegistry::Harbor => write!(f, "harbor"),
        }
    }
}

/// A container image built from a repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerImage {
    /// Image repository, e.g. `sslhep/servicex_app`
    pub repo: String,
    pub registry: ContainerRegistry,
}

/// Where a record's commit comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRef {
    /// Resolve the head of this branch
    Branch(String),
    /// Use this commit as-is once the host confirms it exists
    Commit(String),
}

impl SourceRef {
    /// Human readable description for error messages
    pub fn describe(&self) -> String {
        match self {
            SourceRef::Branch(branch) => format!("branch {}", branch),
            SourceRef::Commit(sha) => format!("commit {}", sha),
        }
    }
}

/// One repository taking part in a release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRecord {
    /// Repository name under the configured organization; unique per batch
    pub name: String,
    pub source: SourceRef,
    /// Suffix appended to generated tags
    pub label: String,
    pub tag_type: TagType,
    /// Version used for semver tags
    pub semver: Option<String>,
    pub container: Option<ContainerImage>,
    /// Existing tag to copy when retagging
    pub old_tag: Option<String>,
    tag: Option<String>,
    commit: Option<String>,
}

impl RepoRecord {
    /// Create a record with no release state
    pub fn new(
        name: impl Into<String>,
        source: SourceRef,
        label: impl Into<String>,
        tag_type: TagType,
    ) -> Self {
        Self {
            name: name.into(),
            source,
            label: label.into(),
            tag_type,
            semver: None,
            container: None,
            old_tag: None,
            tag: None,
            commit: None,
        }
    }

    pub fn with_semver(mut self, semver: impl Into<String>) -> Self {
        self.semver = Some(semver.into());
        self
    }

    pub fn with_container(mut self, repo: impl Into<String>, registry: ContainerRegistry) -> Self {
        self.container = Some(ContainerImage {
            repo: repo.into(),
            registry,
        });
        self
    }

    pub fn with_old_tag(mut self, old_tag: impl Into<String>) -> Self {
        self.old_tag = Some(old_tag.into());
        self
    }

    /// Check the record invariants
    ///
    /// Semver records must carry a non-empty version.
    pub fn validate(&self) -> Result<()> {
        if self.tag_type == TagType::Semver
            && self.semver.as_deref().is_none_or(|v| v.trim().is_empty())
        {
            return Err(CoreError::MissingSemver {
                name: self.name.clone(),
            });
        }
        Ok(())
    }

    /// Branch to resolve, if the record is branch sourced
    pub fn branch(&self) -> Option<&str> {
        match &self.source {
            SourceRef::Branch(branch) => Some(branch),
            SourceRef::Commit(_) => None,
        }
    }

    /// Commit supplied by configuration, if any
    pub fn preset_commit(&self) -> Option<&str> {
        match &self.source {
            SourceRef::Commit(sha) => Some(sha),
            SourceRef::Branch(_) => None,
        }
    }

    /// Resolved commit sha
    pub fn commit(&self) -> Option<&str> {
        self.commit.as_deref()
    }

    /// Generated tag
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Record the resolved commit; a record is resolved only once
    pub fn set_commit(&mut self, sha: impl Into<String>) -> Result<()> {
        if let Some(existing) = &self.commit {
            return Err(CoreError::AlreadySet {
                name: self.name.clone(),
                field: "commit",
                value: existing.clone(),
            });
        }
        self.commit = Some(sha.into());
        Ok(())
    }

    /// Record the generated tag; a record is tagged only once
    pub fn set_tag(&mut self, tag: impl Into<String>) -> Result<()> {
        if let Some(existing) = &self.tag {
            return Err(CoreError::AlreadySet {
                name: self.name.clone(),
                field: "tag",
                value: existing.clone(),
            });
        }
        self.tag = Some(tag.into());
        Ok(())
    }
}

/// True when `value` looks like a full 40 character hex commit sha
pub fn looks_like_sha(value: &str) -> bool {
    value.len() == 40 && value.chars().all(|c| c.is_ascii_hexdigit())
}
