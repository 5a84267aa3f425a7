//! In-memory git and packaging tools for testing
//!
//! Operations are recorded in order so tests can assert the publish sequence
//! without a network or real repositories. Repositories are identified in
//! the log by the url they were cloned from.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::error::{ChartError, Result};
use crate::git::GitClient;
use crate::package::PackageTool;

type Log = Arc<RwLock<Vec<String>>>;

fn record(log: &Log, op: String) {
    if let Ok(mut ops) = log.write() {
        ops.push(op);
    }
}

fn snapshot(log: &Log) -> Vec<String> {
    log.read().map(|ops| ops.clone()).unwrap_or_default()
}

/// Git client that materializes seeded files on clone
#[derive(Clone, Default)]
pub struct MockGit {
    log: Log,
    seeds: HashMap<String, Vec<(PathBuf, String)>>,
    clones: Arc<RwLock<HashMap<PathBuf, String>>>,
    failing_push: Option<String>,
}

impl MockGit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Files to write into any clone of `url`
    pub fn with_files<I, P, S>(mut self, url: &str, files: I) -> Self
    where
        I: IntoIterator<Item = (P, S)>,
        P: Into<PathBuf>,
        S: Into<String>,
    {
        self.seeds.insert(
            url.to_string(),
            files
                .into_iter()
                .map(|(p, s)| (p.into(), s.into()))
                .collect(),
        );
        self
    }

    /// Make pushes of the clone of `url` fail
    pub fn failing_push(mut self, url: &str) -> Self {
        self.failing_push = Some(url.to_string());
        self
    }

    /// Operations performed so far
    pub fn operations(&self) -> Vec<String> {
        snapshot(&self.log)
    }

    fn origin(&self, repo: &Path) -> String {
        self.clones
            .read()
            .ok()
            .and_then(|c| c.get(repo).cloned())
            .unwrap_or_else(|| repo.display().to_string())
    }
}

impl GitClient for MockGit {
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<()> {
        std::fs::create_dir_all(dest)?;
        for (path, content) in self.seeds.get(url).into_iter().flatten() {
            let target = dest.join(path);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(target, content)?;
        }
        if let Ok(mut clones) = self.clones.write() {
            clones.insert(dest.to_path_buf(), url.to_string());
        }
        record(&self.log, format!("clone {}", url));
        Ok(())
    }

    fn checkout_branch(&self, repo: &Path, branch: &str) -> Result<()> {
        record(&self.log, format!("switch {} {}", self.origin(repo), branch));
        Ok(())
    }

    fn add_file(&self, repo: &Path, file: &Path) -> Result<()> {
        if !repo.join(file).exists() {
            return Err(ChartError::CommandFailed {
                command: format!("git add {}", file.display()),
                stderr: "pathspec did not match any files".to_string(),
            });
        }
        record(
            &self.log,
            format!("add {} {}", self.origin(repo), file.display()),
        );
        Ok(())
    }

    fn commit(&self, repo: &Path, message: &str) -> Result<()> {
        record(&self.log, format!("commit {} {}", self.origin(repo), message));
        Ok(())
    }

    fn push(&self, repo: &Path) -> Result<()> {
        let origin = self.origin(repo);
        if self.failing_push.as_deref() == Some(origin.as_str()) {
            return Err(ChartError::CommandFailed {
                command: "git push origin".to_string(),
                stderr: "remote rejected".to_string(),
            });
        }
        record(&self.log, format!("push {}", origin));
        Ok(())
    }
}

/// Packaging tool that writes a fixed archive name
#[derive(Clone)]
pub struct MockPackage {
    log: Log,
    archive: String,
}

impl MockPackage {
    pub fn new(archive: impl Into<String>) -> Self {
        Self {
            log: Log::default(),
            archive: archive.into(),
        }
    }

    /// Operations performed so far
    pub fn operations(&self) -> Vec<String> {
        snapshot(&self.log)
    }
}

impl PackageTool for MockPackage {
    fn package_chart(&self, chart_dir: &Path, dest: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dest)?;
        let archive = dest.join(&self.archive);
        std::fs::write(&archive, format!("packaged {}", chart_dir.display()))?;
        record(&self.log, format!("package {}", self.archive));
        Ok(archive)
    }

    fn update_index(&self, repo_dir: &Path, url: &str) -> Result<()> {
        let mut entries: Vec<String> = std::fs::read_dir(repo_dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|name| name.ends_with(".tgz"))
            .collect();
        entries.sort();
        std::fs::write(
            repo_dir.join(crate::publisher::INDEX_FILE),
            format!("url: {}\nentries: {:?}\n", url, entries),
        )?;
        record(&self.log, format!("index {}", url));
        Ok(())
    }
}
