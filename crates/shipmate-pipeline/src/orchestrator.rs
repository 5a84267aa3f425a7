//! Release flows
//!
//! Each flow runs its batch in order and stops at the first failure. Remote
//! mutations only start after the operator has approved the whole batch.

use chrono::{DateTime, Utc};
use shipmate_chart::{GitClient, PackageTool, PreparedRelease, ReleasePublisher};
use shipmate_core::{
    Clock, OperatorGate, RepoRecord, Reporter, Settings, SystemClock, Table, TagGenerator,
};
use shipmate_host::{
    CommitResolver, ContainerVerifier, HostClient, HostError, MonitorSummary, PublishedTag,
    Selector, TagPublisher, WorkflowMonitor, retag_message,
};

use crate::error::{PipelineError, Result};

/// Result of a `tag` run
#[derive(Debug, Clone)]
pub struct TagOutcome {
    pub published: Vec<PublishedTag>,
    /// Present when verification was requested
    pub verification: Option<Verification>,
}

/// Post-publish checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verification {
    pub workflows: MonitorSummary,
    pub images_checked: usize,
}

/// Sequences the release components under operator confirmation
pub struct Orchestrator<'a, C = SystemClock> {
    client: &'a HostClient,
    containers: &'a ContainerVerifier,
    settings: &'a Settings,
    reporter: &'a dyn Reporter,
    gate: &'a dyn OperatorGate,
    tags: TagGenerator<C>,
}

impl<'a> Orchestrator<'a, SystemClock> {
    pub fn new(
        client: &'a HostClient,
        containers: &'a ContainerVerifier,
        settings: &'a Settings,
        reporter: &'a dyn Reporter,
        gate: &'a dyn OperatorGate,
    ) -> Self {
        Self {
            client,
            containers,
            settings,
            reporter,
            gate,
            tags: TagGenerator::new(SystemClock),
        }
    }
}

impl<'a, C: Clock> Orchestrator<'a, C> {
    /// Use another clock for tag generation and time windows
    pub fn with_clock<D: Clock>(self, clock: D) -> Orchestrator<'a, D> {
        Orchestrator {
            client: self.client,
            containers: self.containers,
            settings: self.settings,
            reporter: self.reporter,
            gate: self.gate,
            tags: TagGenerator::new(clock),
        }
    }

    /// Resolve, tag, confirm and publish a batch, optionally verifying it
    pub async fn tag(&self, records: &mut [RepoRecord], verify: bool) -> Result<TagOutcome> {
        ensure_records(records)?;
        self.require_token("publish tags")?;

        self.reporter.info("Checking repositories");
        CommitResolver::new(self.client)
            .check_repos(records, self.reporter)
            .await?;
        self.tags.assign(records)?;

        let mut table = Table::new(["Repo", "URL", "Tag"]).with_title("Tags to publish");
        for record in records.iter() {
            table.push_row([
                record.name.clone(),
                self.client.repo_url(&record.name),
                record.tag().unwrap_or_default().to_string(),
            ]);
        }
        if !self.gate.confirm("Publish these tags?", Some(&table)) {
            return Err(PipelineError::declined("publish tags"));
        }

        let started = self.tags.now();
        let messages = vec![self.settings.tag_message.clone(); records.len()];
        let published = self.publish_all(records, &messages).await?;

        let verification = if verify {
            Some(self.verify_release(records, started).await?)
        } else {
            None
        };

        Ok(TagOutcome {
            published,
            verification,
        })
    }

    /// Publish new tags at the commits existing tags point to
    pub async fn retag(&self, records: &mut [RepoRecord]) -> Result<Vec<PublishedTag>> {
        ensure_records(records)?;
        self.require_token("publish tags")?;
        if let Some(record) = records.iter().find(|r| r.old_tag.is_none()) {
            return Err(HostError::MissingOldTag {
                repo: record.name.clone(),
            }
            .into());
        }

        self.reporter.info("Looking up existing tags");
        CommitResolver::new(self.client)
            .check_tags(records, self.reporter)
            .await?;
        self.tags.assign(records)?;

        let mut table = Table::new(["Repo", "URL", "Commit", "Old tag", "New tag"])
            .with_title("Tags to publish");
        let mut messages = Vec::with_capacity(records.len());
        for record in records.iter() {
            let old_tag = record.old_tag.clone().unwrap_or_default();
            let new_tag = record.tag().unwrap_or_default().to_string();
            messages.push(retag_message(&old_tag, &new_tag));
            table.push_row([
                record.name.clone(),
                self.client.repo_url(&record.name),
                record.commit().unwrap_or_default().to_string(),
                old_tag,
                new_tag,
            ]);
        }
        if !self.gate.confirm("Publish these tags?", Some(&table)) {
            return Err(PipelineError::declined("retag repositories"));
        }

        self.publish_all(records, &messages).await
    }

    /// Follow the workflow runs selected by a tag or a time
    ///
    /// With neither, the operator is asked whether to use the current time.
    pub async fn monitor(
        &self,
        records: &[RepoRecord],
        tag: Option<&str>,
        time: Option<DateTime<Utc>>,
    ) -> Result<MonitorSummary> {
        let selector = match (tag.map(str::trim).filter(|t| !t.is_empty()), time) {
            (Some(tag), _) => Selector::Tag(tag.to_string()),
            (None, Some(at)) => Selector::Window(at),
            (None, None) => {
                if !self
                    .gate
                    .confirm("Monitor workflows started around the current time?", None)
                {
                    return Err(PipelineError::NoSelector);
                }
                Selector::Window(self.tags.now())
            }
        };
        self.watch(records, &selector).await
    }

    /// Check every configured image exists under `tag`
    pub async fn verify_containers(&self, records: &[RepoRecord], tag: &str) -> Result<usize> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(PipelineError::EmptyTag);
        }
        let checked = self.containers.verify_all(records, tag, self.reporter).await?;
        self.reporter
            .success(&format!("Found {} container images tagged {}", checked, tag));
        Ok(checked)
    }

    /// Prepare a chart release and, when `publish` is set and approved, push it
    pub fn release(
        &self,
        git: &dyn GitClient,
        package: &dyn PackageTool,
        tag: &str,
        chart_version: &str,
        publish: bool,
    ) -> Result<PreparedRelease> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(PipelineError::EmptyTag);
        }

        let publisher = ReleasePublisher::new(git, package, &self.settings.chart);
        let prepared = publisher.prepare(tag, chart_version, self.reporter)?;

        let chart = &self.settings.chart;
        let mut table = Table::new(["Repository", "Branch", "Change"]).with_title("Chart release");
        for key in &prepared.changed {
            table.push_row([
                chart.source_repo.as_str(),
                chart.source_branch.as_str(),
                key.as_str(),
            ]);
        }
        table.push_row([
            chart.index_repo.as_str(),
            chart.index_branch.as_str(),
            prepared.archive.as_str(),
        ]);
        self.reporter.table(&table);

        if !publish {
            self.reporter
                .info("Committed locally only; pass --publish to push the release");
            return Ok(prepared);
        }

        if !self.gate.confirm("Push the chart release?", Some(&table)) {
            return Err(PipelineError::declined("push the chart release"));
        }
        publisher.push(&prepared, self.reporter)?;
        self.reporter.success(&format!(
            "Published chart {} for {}",
            prepared.chart_version, prepared.tag
        ));
        Ok(prepared)
    }

    async fn publish_all(
        &self,
        records: &[RepoRecord],
        messages: &[String],
    ) -> Result<Vec<PublishedTag>> {
        let publisher = TagPublisher::new(self.client, &self.settings.tag_message);
        let total = records.len();
        let mut published = Vec::with_capacity(total);

        for (i, (record, message)) in records.iter().zip(messages).enumerate() {
            self.reporter
                .progress(i, total, &format!("tagging {}", record.name));
            match publisher.publish_with_message(record, message).await {
                Ok(tag) => {
                    self.reporter.success(&format!(
                        "Tagged {} at {} as {}",
                        tag.repo, tag.commit, tag.tag
                    ));
                    published.push(tag);
                }
                Err(e) => {
                    self.reporter.progress(total, total, "failed");
                    self.reporter
                        .error(&format!("Failed to tag {}: {}", record.name, e));
                    return Err(e.into());
                }
            }
        }
        self.reporter.progress(total, total, "tagged");
        Ok(published)
    }

    async fn verify_release(
        &self,
        records: &[RepoRecord],
        published_at: DateTime<Utc>,
    ) -> Result<Verification> {
        let workflows = self
            .watch(records, &Selector::Window(published_at))
            .await?;

        let mut images_checked = 0;
        for record in records.iter().filter(|r| r.container.is_some()) {
            let tag = record.tag().unwrap_or_default();
            self.containers.verify(record, tag).await?;
            images_checked += 1;
        }
        if images_checked > 0 {
            self.reporter
                .success(&format!("Found all {} container images", images_checked));
        }

        Ok(Verification {
            workflows,
            images_checked,
        })
    }

    async fn watch(&self, records: &[RepoRecord], selector: &Selector) -> Result<MonitorSummary> {
        let monitor = WorkflowMonitor::new(self.client, self.settings.poll_interval);
        self.reporter
            .info(&format!("Finding workflows for {}", selector));
        let runs = monitor.discover(records, selector, self.reporter).await?;
        let refs = monitor.poll_until_converged(&runs, self.reporter).await?;

        let summary = MonitorSummary::from_runs(&refs);
        if summary.failed > 0 {
            self.reporter.warn(&summary.to_string());
        } else {
            self.reporter.success(&summary.to_string());
        }
        Ok(summary)
    }

    fn require_token(&self, action: &str) -> Result<()> {
        match self.client.token() {
            Some(token) if token.looks_valid() => Ok(()),
            Some(_) => Err(HostError::InvalidToken.into()),
            None => Err(HostError::MissingToken {
                action: action.to_string(),
            }
            .into()),
        }
    }
}

fn ensure_records(records: &[RepoRecord]) -> Result<()> {
    if records.is_empty() {
        return Err(PipelineError::NoRepositories);
    }
    Ok(())
}
