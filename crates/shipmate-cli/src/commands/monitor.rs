//! Monitor-workflows command

use std::path::Path;

use chrono::{DateTime, Utc};

use super::Session;
use crate::error::Result;

/// Follow runs selected by `tag` or `time` until all have concluded
///
/// Failed runs are reported in the summary but do not fail the command.
pub async fn run(
    config: &Path,
    token: Option<String>,
    tag: Option<&str>,
    time: Option<DateTime<Utc>>,
) -> Result<()> {
    let session = Session::open_with_token(config, token)?;
    let summary = session
        .orchestrator()
        .monitor(&session.records, tag, time)
        .await?;
    tracing::info!(%summary, "monitoring finished");
    Ok(())
}
