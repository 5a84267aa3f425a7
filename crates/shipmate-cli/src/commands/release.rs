//! Release command - update, package and publish the Helm chart

use std::path::Path;

use shipmate_chart::{Helm, SystemGit};

use super::Session;
use crate::error::Result;

pub fn run(config: &Path, tag: &str, chart_version: &str, publish: bool) -> Result<()> {
    let session = Session::open(config)?;
    let git = SystemGit::new();
    let helm = Helm::new();

    let prepared = session
        .orchestrator()
        .release(&git, &helm, tag, chart_version, publish)?;
    tracing::debug!(
        scratch = %prepared.scratch_dir().display(),
        published = publish,
        "removing scratch directory"
    );
    Ok(())
}
