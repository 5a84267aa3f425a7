//! Packaging port and the `helm` adapter

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{ChartError, Result};

/// Chart packaging operations
pub trait PackageTool: Send + Sync {
    /// Refresh the chart's dependencies and package it into `dest`
    ///
    /// Returns the path of the versioned archive.
    fn package_chart(&self, chart_dir: &Path, dest: &Path) -> Result<PathBuf>;

    /// Regenerate the chart index of `repo_dir`, served from `url`
    fn update_index(&self, repo_dir: &Path, url: &str) -> Result<()>;
}

/// [`PackageTool`] running the `helm` binary
#[derive(Debug, Clone)]
pub struct Helm {
    binary: String,
}

impl Default for Helm {
    fn default() -> Self {
        Self {
            binary: "helm".to_string(),
        }
    }
}

impl Helm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific helm binary
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn run(&self, dir: &Path, args: &[&str]) -> Result<String> {
        let command = format!("{} {}", self.binary, args.join(" "));
        tracing::debug!(%command, dir = %dir.display(), "running helm");

        let output = Command::new(&self.binary)
            .current_dir(dir)
            .args(args)
            .output()
            .map_err(|e| ChartError::CommandSpawn {
                command: command.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(ChartError::CommandFailed {
                command,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl PackageTool for Helm {
    fn package_chart(&self, chart_dir: &Path, dest: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dest)?;
        let chart = chart_dir.to_string_lossy();
        let dest_arg = dest.to_string_lossy();

        self.run(chart_dir, &["dependency", "update", &chart])?;
        let stdout = self.run(chart_dir, &["package", &chart, "--destination", &dest_arg])?;

        match packaged_path(&stdout) {
            Some(path) if path.is_file() => Ok(path),
            _ => find_archive(dest),
        }
    }

    fn update_index(&self, repo_dir: &Path, url: &str) -> Result<()> {
        self.run(repo_dir, &["repo", "index", ".", "--url", url])?;
        Ok(())
    }
}

/// Archive path from `helm package` output
pub fn packaged_path(stdout: &str) -> Option<PathBuf> {
    stdout
        .lines()
        .find_map(|line| line.split_once("saved it to:"))
        .map(|(_, path)| PathBuf::from(path.trim()))
        .filter(|path| !path.as_os_str().is_empty())
}

/// The single `.tgz` archive in `dir`
pub fn find_archive(dir: &Path) -> Result<PathBuf> {
    let not_found = || ChartError::ArchiveNotFound {
        dir: dir.display().to_string(),
    };
    let pattern = dir.join("*.tgz");
    let pattern = pattern.to_str().ok_or_else(not_found)?;

    glob::glob(pattern)
        .map_err(|_| not_found())?
        .filter_map(|entry| entry.ok())
        .next()
        .ok_or_else(not_found)
}
