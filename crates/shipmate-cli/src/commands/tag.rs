//! Tag command - tag every repository at its branch head or commit

use std::path::Path;

use shipmate_core::Reporter;

use super::Session;
use crate::error::Result;

pub async fn run(config: &Path, token: Option<String>, verify: bool) -> Result<()> {
    let mut session = Session::open_with_token(config, token)?;
    let mut records = std::mem::take(&mut session.records);

    let outcome = session.orchestrator().tag(&mut records, verify).await?;

    session
        .reporter
        .success(&format!("Published {} tags", outcome.published.len()));
    if let Some(verification) = outcome.verification {
        tracing::info!(
            runs = verification.workflows.total(),
            images = verification.images_checked,
            "verified release"
        );
    }
    Ok(())
}
