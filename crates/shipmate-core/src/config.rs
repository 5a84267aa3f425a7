//! Release configuration
//!
//! A configuration file is TOML. Every top-level table names one repository,
//! except the reserved `[shipmate]` table which carries global settings:
//!
//! ```toml
//! [shipmate]
//! organization = "ssl-hep"
//! poll-interval = "30s"
//!
//! [ServiceX]
//! branch-or-commit = "develop"
//! label = "develop1"
//! tagtype = "calver"
//! container_repo = "sslhep/servicex_app"
//! container_registry = "dockerhub"
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{CoreError, Result};
use crate::record::{ContainerRegistry, RepoRecord, SourceRef, TagType, looks_like_sha};

/// Name of the reserved settings table
pub const SETTINGS_SECTION: &str = "shipmate";

const REPO_KEYS: &[&str] = &[
    "branch-or-commit",
    "branch",
    "commit",
    "label",
    "tagtype",
    "semver",
    "container_repo",
    "container_registry",
    "old-tag",
];

/// Source of typed release configuration
pub trait ConfigStore {
    /// Repository records in file order
    fn records(&self) -> Vec<RepoRecord>;

    /// Global settings
    fn settings(&self) -> &Settings;
}

/// Global settings from the `[shipmate]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Settings {
    /// Host API base url
    pub api_url: String,

    /// Organization owning every configured repository
    pub organization: String,

    pub dockerhub_url: String,
    pub harbor_url: String,
    pub harbor_project: String,

    /// Pause between workflow sweeps
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Message stored in newly created tag objects
    pub tag_message: String,

    pub chart: ChartSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            organization: "ssl-hep".to_string(),
            dockerhub_url: "https://hub.docker.com".to_string(),
            harbor_url: "https://hub.opensciencegrid.org".to_string(),
            harbor_project: "sslhep".to_string(),
            poll_interval: Duration::from_secs(30),
            tag_message: "Tagged using shipmate".to_string(),
            chart: ChartSettings::default(),
        }
    }
}

/// Chart release settings from the `[shipmate.chart]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct ChartSettings {
    /// Clone url of the repository holding the chart sources
    pub source_repo: String,
    pub source_branch: String,

    /// Chart directory relative to the source checkout
    pub chart_path: PathBuf,

    /// Clone url of the repository serving the chart index
    pub index_repo: String,
    pub index_branch: String,

    /// Public url the chart index is served from
    pub index_url: String,

    /// Values sections whose `tag` key follows the release tag
    pub image_components: Vec<String>,

    /// Commit message; `{tag}` and `{version}` are substituted
    pub commit_message: String,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            source_repo: "https://github.com/ssl-hep/ServiceX.git".to_string(),
            source_branch: "develop".to_string(),
            chart_path: PathBuf::from("helm/servicex"),
            index_repo: "https://github.com/ssl-hep/ssl-helm-charts.git".to_string(),
            index_branch: "gh-pages".to_string(),
            index_url: "https://ssl-hep.github.io/ssl-helm-charts/".to_string(),
            image_components: ["app", "didFinder", "CERNOpenData", "codeGen", "x509Secrets"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            commit_message: "Release {tag} (chart {version})".to_string(),
        }
    }
}

impl ChartSettings {
    /// Render the commit message for a release
    pub fn commit_message_for(&self, tag: &str, version: &str) -> String {
        self.commit_message
            .replace("{tag}", tag)
            .replace("{version}", version)
    }
}

/// `ConfigStore` backed by a TOML file
#[derive(Debug, Clone)]
pub struct TomlConfigStore {
    settings: Settings,
    records: Vec<RepoRecord>,
}

impl TomlConfigStore {
    /// Load and validate a configuration file
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration text
    pub fn parse(content: &str) -> Result<Self> {
        let mut sections: IndexMap<String, toml::Value> = toml::from_str(content)?;

        let settings = match sections.shift_remove(SETTINGS_SECTION) {
            Some(value) => value
                .try_into::<Settings>()
                .map_err(|e| CoreError::InvalidSettings {
                    message: e.message().to_string(),
                })?,
            None => Settings::default(),
        };

        let records = sections
            .iter()
            .map(|(name, value)| parse_section(name, value))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(repos = records.len(), "loaded configuration");
        Ok(Self { settings, records })
    }
}

impl ConfigStore for TomlConfigStore {
    fn records(&self) -> Vec<RepoRecord> {
        self.records.clone()
    }

    fn settings(&self) -> &Settings {
        &self.settings
    }
}

fn parse_section(name: &str, value: &toml::Value) -> Result<RepoRecord> {
    let table = value
        .as_table()
        .ok_or_else(|| CoreError::section(name, "expected a table of repository settings"))?;

    for key in table.keys() {
        if !REPO_KEYS.contains(&key.as_str()) {
            match suggest_key(key) {
                Some(known) => tracing::warn!(
                    section = name,
                    "unknown key '{}', did you mean '{}'?",
                    key,
                    known
                ),
                None => tracing::warn!(section = name, "unknown key '{}'", key),
            }
        }
    }

    let get = |key: &str| -> Result<Option<String>> {
        match table.get(key) {
            None => Ok(None),
            Some(toml::Value::String(s)) => Ok(Some(s.trim().to_string())),
            // A bare `semver = 1.10` is a float and would lose digits
            Some(_) => Err(CoreError::section(
                name,
                format!("'{}' must be a quoted string", key),
            )),
        }
    };

    let source = source_ref(name, get("branch-or-commit")?, get("branch")?, get("commit")?)?;

    let label = get("label")?
        .filter(|l| !l.is_empty())
        .ok_or_else(|| CoreError::section(name, "missing 'label'"))?;

    let tag_type: TagType = get("tagtype")?
        .ok_or_else(|| CoreError::section(name, "missing 'tagtype'"))?
        .parse()
        .map_err(|e: CoreError| CoreError::section(name, e.to_string()))?;

    let mut record = RepoRecord::new(name, source, label, tag_type);

    if let Some(semver) = get("semver")? {
        record = record.with_semver(semver);
    }
    if record.validate().is_err() {
        return Err(CoreError::section(name, "semver tag type requires 'semver'"));
    }

    match (get("container_repo")?, get("container_registry")?) {
        (Some(repo), Some(registry)) if !repo.is_empty() => {
            let registry: ContainerRegistry = registry
                .parse()
                .map_err(|e: CoreError| CoreError::section(name, e.to_string()))?;
            record = record.with_container(repo, registry);
        }
        (Some(_), None) => {
            return Err(CoreError::section(
                name,
                "'container_repo' requires 'container_registry'",
            ));
        }
        (None, Some(_)) => {
            return Err(CoreError::section(
                name,
                "'container_registry' requires 'container_repo'",
            ));
        }
        _ => {}
    }

    if let Some(old_tag) = get("old-tag")?.filter(|t| !t.is_empty()) {
        record = record.with_old_tag(old_tag);
    }

    Ok(record)
}

fn source_ref(
    section: &str,
    either: Option<String>,
    branch: Option<String>,
    commit: Option<String>,
) -> Result<SourceRef> {
    let (mut branch, mut commit) = (branch, commit.map(|c| c.to_lowercase()));
    if let Some(value) = either {
        if looks_like_sha(&value) {
            commit = commit.or(Some(value.to_lowercase()));
        } else {
            branch = branch.or(Some(value));
        }
    }

    match (branch.filter(|b| !b.is_empty()), commit.filter(|c| !c.is_empty())) {
        (Some(_), Some(commit)) => {
            tracing::warn!(section, "branch and commit both set, using commit");
            Ok(SourceRef::Commit(commit))
        }
        (None, Some(commit)) => Ok(SourceRef::Commit(commit)),
        (Some(branch), None) => Ok(SourceRef::Branch(branch)),
        (None, None) => Err(CoreError::section(
            section,
            "missing 'branch-or-commit' (or 'branch' / 'commit')",
        )),
    }
}

fn suggest_key(key: &str) -> Option<&'static str> {
    REPO_KEYS
        .iter()
        .map(|known| (*known, strsim::jaro_winkler(key, known)))
        .filter(|(_, score)| *score > 0.8)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(known, _)| known)
}
