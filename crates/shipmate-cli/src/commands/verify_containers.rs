//! Verify-containers command

use std::path::Path;

use super::Session;
use crate::error::Result;

/// Check every configured image for `tag`; registries need no token
pub async fn run(config: &Path, tag: &str) -> Result<()> {
    let session = Session::open(config)?;
    session
        .orchestrator()
        .verify_containers(&session.records, tag)
        .await?;
    Ok(())
}
