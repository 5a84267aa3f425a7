//! Retag command - new tags at the commits existing tags point to

use std::path::Path;

use shipmate_core::Reporter;

use super::Session;
use crate::error::Result;

pub async fn run(config: &Path, token: Option<String>) -> Result<()> {
    let mut session = Session::open_with_token(config, token)?;
    let mut records = std::mem::take(&mut session.records);

    let published = session.orchestrator().retag(&mut records).await?;

    session
        .reporter
        .success(&format!("Published {} tags", published.len()));
    Ok(())
}
