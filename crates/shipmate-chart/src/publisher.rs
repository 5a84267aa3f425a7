//! Chart release publishing
//!
//! A release runs in a scratch directory that is removed however the release
//! ends:
//!
//! 1. create the scratch directory
//! 2. clone the chart source repository and switch to its development branch
//! 3. point `Chart.yaml` and `values.yaml` at the release
//! 4. commit the manifests in the source repository
//! 5. clone the chart index repository and switch to its publish branch
//! 6. package the chart, move the archive into the index and regenerate it
//! 7. commit the archive and index
//! 8. push the source repository, then the index repository
//!
//! Steps 1 to 7 are local ([`ReleasePublisher::prepare`]); step 8 is
//! [`ReleasePublisher::push`]. A failure after step 4 leaves only a local
//! commit behind. A failure of the second push leaves the source pushed and
//! the index unpublished; neither case is rolled back.

use shipmate_core::manifest::{self, CHART_FILE, VALUES_FILE};
use shipmate_core::{ChartSettings, Reporter};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::error::{ChartError, Result};
use crate::git::GitClient;
use crate::package::PackageTool;

/// Name of the index file maintained in the index repository
pub const INDEX_FILE: &str = "index.yaml";

const STEPS: usize = 8;

/// A release committed locally and ready to push
///
/// Dropping it removes the scratch directory.
#[derive(Debug)]
pub struct PreparedRelease {
    scratch: TempDir,
    pub tag: String,
    pub chart_version: String,
    pub source_dir: PathBuf,
    pub index_dir: PathBuf,
    /// Archive file name inside the index repository
    pub archive: String,
    /// Manifest keys changed in the source repository
    pub changed: Vec<String>,
}

impl PreparedRelease {
    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }
}

/// Drives the chart release sequence through git and packaging ports
pub struct ReleasePublisher<'a> {
    git: &'a dyn GitClient,
    package: &'a dyn PackageTool,
    settings: &'a ChartSettings,
}

impl<'a> ReleasePublisher<'a> {
    pub fn new(
        git: &'a dyn GitClient,
        package: &'a dyn PackageTool,
        settings: &'a ChartSettings,
    ) -> Self {
        Self {
            git,
            package,
            settings,
        }
    }

    /// Run the whole sequence, pushing both repositories
    pub fn publish_chart_release(
        &self,
        tag: &str,
        chart_version: &str,
        reporter: &dyn Reporter,
    ) -> Result<PreparedRelease> {
        let prepared = self.prepare(tag, chart_version, reporter)?;
        self.push(&prepared, reporter)?;
        Ok(prepared)
    }

    /// Steps 1 to 7: everything up to and including the local commits
    pub fn prepare(
        &self,
        tag: &str,
        chart_version: &str,
        reporter: &dyn Reporter,
    ) -> Result<PreparedRelease> {
        validate_chart_version(chart_version)?;

        reporter.progress(0, STEPS, "creating scratch directory");
        let scratch = tempfile::Builder::new()
            .prefix("shipmate-release-")
            .tempdir()?;
        let source_dir = scratch.path().join("source");
        let index_dir = scratch.path().join("index");
        tracing::info!(scratch = %scratch.path().display(), %tag, %chart_version, "preparing chart release");

        reporter.progress(1, STEPS, "cloning chart sources");
        self.git.clone_repo(&self.settings.source_repo, &source_dir)?;
        self.git
            .checkout_branch(&source_dir, &self.settings.source_branch)?;

        reporter.progress(2, STEPS, "updating chart manifests");
        let chart_dir = source_dir.join(&self.settings.chart_path);
        let mut changed =
            manifest::update_chart_metadata(&chart_dir.join(CHART_FILE), tag, chart_version)?;
        changed.extend(manifest::update_values(
            &chart_dir.join(VALUES_FILE),
            tag,
            &self.settings.image_components,
        )?);
        tracing::debug!(?changed, "updated manifests");

        reporter.progress(3, STEPS, "committing chart sources");
        let message = self.settings.commit_message_for(tag, chart_version);
        self.git
            .add_file(&source_dir, &self.settings.chart_path.join(CHART_FILE))?;
        self.git
            .add_file(&source_dir, &self.settings.chart_path.join(VALUES_FILE))?;
        self.git.commit(&source_dir, &message)?;

        reporter.progress(4, STEPS, "cloning chart index");
        self.git.clone_repo(&self.settings.index_repo, &index_dir)?;
        self.git
            .checkout_branch(&index_dir, &self.settings.index_branch)?;

        reporter.progress(5, STEPS, "packaging chart");
        let dist = scratch.path().join("dist");
        let packaged = self.package.package_chart(&chart_dir, &dist)?;
        let archive = packaged
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| ChartError::ArchiveNotFound {
                dir: dist.display().to_string(),
            })?;
        move_file(&packaged, &index_dir.join(&archive))?;
        self.package
            .update_index(&index_dir, &self.settings.index_url)?;

        reporter.progress(6, STEPS, "committing chart index");
        self.git.add_file(&index_dir, Path::new(&archive))?;
        self.git.add_file(&index_dir, Path::new(INDEX_FILE))?;
        self.git.commit(&index_dir, &message)?;

        reporter.progress(7, STEPS, "committed locally");
        Ok(PreparedRelease {
            scratch,
            tag: tag.to_string(),
            chart_version: chart_version.to_string(),
            source_dir,
            index_dir,
            archive,
            changed,
        })
    }

    /// Step 8: push the source repository, then the index repository
    pub fn push(&self, prepared: &PreparedRelease, reporter: &dyn Reporter) -> Result<()> {
        self.git.push(&prepared.source_dir)?;
        tracing::info!(repo = %self.settings.source_repo, "pushed chart sources");

        if let Err(e) = self.git.push(&prepared.index_dir) {
            reporter.error(&format!(
                "Chart sources were pushed but the chart index was not: {}",
                e
            ));
            return Err(e);
        }
        tracing::info!(repo = %self.settings.index_repo, "pushed chart index");
        reporter.progress(STEPS, STEPS, "pushed");
        Ok(())
    }
}

/// Check that `version` is a SemVer 2 version
pub fn validate_chart_version(version: &str) -> Result<()> {
    semver::Version::parse(version).map_err(|e| ChartError::InvalidChartVersion {
        version: version.to_string(),
        message: e.to_string(),
    })?;
    Ok(())
}

fn move_file(from: &Path, to: &Path) -> Result<()> {
    if std::fs::rename(from, to).is_err() {
        std::fs::copy(from, to)?;
        std::fs::remove_file(from)?;
    }
    Ok(())
}
