//! Git port and the system `git` adapter

use std::path::Path;
use std::process::Command;

use crate::error::{ChartError, Result};

/// Local git operations needed to publish a chart
pub trait GitClient: Send + Sync {
    /// Clone `url` into `dest`
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<()>;

    /// Switch the checkout at `repo` to `branch`
    fn checkout_branch(&self, repo: &Path, branch: &str) -> Result<()>;

    /// Stage `file`, relative to `repo`
    fn add_file(&self, repo: &Path, file: &Path) -> Result<()>;

    /// Commit staged changes
    fn commit(&self, repo: &Path, message: &str) -> Result<()>;

    /// Push the current branch to `origin`
    fn push(&self, repo: &Path) -> Result<()>;
}

/// [`GitClient`] running the system `git` binary
///
/// The user's git configuration is honored so commits are signed and
/// pushes authenticated the way the operator normally works.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemGit;

impl SystemGit {
    pub fn new() -> Self {
        Self
    }

    fn run(&self, dir: Option<&Path>, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new("git");
        if let Some(dir) = dir {
            cmd.arg("-C").arg(dir);
        }
        cmd.arg("-c").arg("advice.detachedHead=false");
        cmd.args(args);

        let command = format!("git {}", args.join(" "));
        tracing::debug!(%command, dir = ?dir, "running git");

        let output = cmd.output().map_err(|e| ChartError::CommandSpawn {
            command: command.clone(),
            message: e.to_string(),
        })?;

        if !output.status.success() {
            return Err(ChartError::CommandFailed {
                command,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl GitClient for SystemGit {
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<()> {
        let dest = dest.to_string_lossy();
        self.run(None, &["clone", "--quiet", url, &dest])?;
        Ok(())
    }

    fn checkout_branch(&self, repo: &Path, branch: &str) -> Result<()> {
        self.run(Some(repo), &["switch", "--quiet", branch])?;
        Ok(())
    }

    fn add_file(&self, repo: &Path, file: &Path) -> Result<()> {
        let file = file.to_string_lossy();
        self.run(Some(repo), &["add", "--", &file])?;
        Ok(())
    }

    fn commit(&self, repo: &Path, message: &str) -> Result<()> {
        self.run(Some(repo), &["commit", "--quiet", "-m", message])?;
        Ok(())
    }

    fn push(&self, repo: &Path) -> Result<()> {
        self.run(Some(repo), &["push", "--quiet", "origin"])?;
        Ok(())
    }
}
