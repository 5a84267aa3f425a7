//! CI workflow discovery and convergence polling
//!
//! Runs are discovered once, either by the tag that triggered them or by a
//! time window around an instant. The discovered set never grows. Each sweep
//! re-fetches every run and the last job of each run; polling stops when
//! every run has a terminal conclusion. The `status` field is only displayed.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use indexmap::IndexMap;
use serde::Deserialize;
use shipmate_core::{EndpointKind, RepoRecord, Reporter, ResponseClass, Table};
use std::time::Duration;

use crate::client::HostClient;
use crate::error::{HostError, Result};

/// Conclusions after which a run will not change again
pub const TERMINAL_CONCLUSIONS: &[&str] = &[
    "success",
    "completed",
    "cancelled",
    "failure",
    "action_required",
    "timed_out",
    "skipped",
];

/// Half width of a time window selector
pub const WINDOW_MINUTES: i64 = 5;

const LIST_PAGE_SIZE: usize = 100;

/// How runs are picked at discovery time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Runs triggered by a push of this tag
    Tag(String),
    /// Runs created within [`WINDOW_MINUTES`] of this instant
    Window(DateTime<Utc>),
}

impl Selector {
    fn query(&self) -> Vec<(&'static str, String)> {
        match self {
            Selector::Tag(tag) => vec![("event", "push".to_string()), ("branch", tag.clone())],
            Selector::Window(at) => {
                let (start, end) = window(*at);
                vec![("created", format!("{}..{}", start, end))]
            }
        }
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Selector::Tag(tag) => write!(f, "tag {}", tag),
            Selector::Window(at) => write!(f, "runs around {}", at.format("%Y-%m-%dT%H:%M:%SZ")),
        }
    }
}

/// Bounds of the window around `at`, formatted for the runs query
pub fn window(at: DateTime<Utc>) -> (String, String) {
    let span = ChronoDuration::minutes(WINDOW_MINUTES);
    let fmt = |t: DateTime<Utc>| t.format("%Y-%m-%dT%H:%M:%SZ").to_string();
    (fmt(at - span), fmt(at + span))
}

/// Whether `conclusion` is terminal
pub fn is_terminal(conclusion: &str) -> bool {
    TERMINAL_CONCLUSIONS.contains(&conclusion)
}

/// Last observed state of one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowRef {
    pub repo: String,
    /// API url of the run, fixed at discovery
    pub run_url: String,
    pub html_url: Option<String>,
    pub workflow_id: Option<u64>,
    pub name: Option<String>,
    pub status: Option<String>,
    pub conclusion: Option<String>,
    pub job_name: Option<String>,
    pub job_status: Option<String>,
    /// The run returned 404 during the last sweep
    pub not_found: bool,
}

impl WorkflowRef {
    fn missing(repo: &str, run_url: &str) -> Self {
        Self {
            repo: repo.to_string(),
            run_url: run_url.to_string(),
            not_found: true,
            ..Default::default()
        }
    }

    /// A run is settled once its conclusion is terminal or it has vanished
    pub fn is_settled(&self) -> bool {
        self.not_found || self.conclusion.as_deref().is_some_and(is_terminal)
    }
}

/// True when every run is settled; an empty set is converged
pub fn converged(runs: &[WorkflowRef]) -> bool {
    runs.iter().all(WorkflowRef::is_settled)
}

/// Runs per outcome once polling has stopped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub other: usize,
    pub not_found: usize,
}

impl MonitorSummary {
    pub fn from_runs(runs: &[WorkflowRef]) -> Self {
        let mut summary = Self::default();
        for run in runs {
            if run.not_found {
                summary.not_found += 1;
                continue;
            }
            match run.conclusion.as_deref() {
                Some("success") => summary.succeeded += 1,
                Some("failure" | "timed_out" | "cancelled" | "action_required") => {
                    summary.failed += 1
                }
                _ => summary.other += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.other + self.not_found
    }
}

impl std::fmt::Display for MonitorSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} runs: {} succeeded, {} failed, {} other",
            self.total(),
            self.succeeded,
            self.failed,
            self.other
        )?;
        if self.not_found > 0 {
            write!(f, ", {} not found", self.not_found)?;
        }
        Ok(())
    }
}

/// Render runs as the status table shown after each sweep
pub fn status_table(runs: &[WorkflowRef]) -> Table {
    let mut table = Table::new([
        "Repo",
        "Workflow",
        "Workflow URL",
        "Status",
        "Conclusion",
        "Current Job",
        "Job Status",
    ])
    .with_title("Workflow Status");

    for run in runs {
        if run.not_found {
            table.push_row([run.repo.as_str(), "", run.run_url.as_str(), "not found"]);
            continue;
        }
        let workflow = run
            .name
            .clone()
            .or_else(|| run.workflow_id.map(|id| id.to_string()))
            .unwrap_or_default();
        table.push_row([
            run.repo.clone(),
            workflow,
            run.html_url.clone().unwrap_or_default(),
            run.status.clone().unwrap_or_default(),
            run.conclusion.clone().unwrap_or_default(),
            run.job_name.clone().unwrap_or_default(),
            run.job_status.clone().unwrap_or_default(),
        ]);
    }
    table
}

#[derive(Debug, Deserialize)]
struct RunList {
    #[serde(default)]
    total_count: Option<usize>,
    #[serde(default)]
    workflow_runs: Vec<RunSummary>,
}

#[derive(Debug, Deserialize)]
struct RunSummary {
    url: String,
}

#[derive(Debug, Deserialize)]
struct RunDetail {
    #[serde(default)]
    workflow_id: Option<u64>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    conclusion: Option<String>,
    #[serde(default)]
    html_url: Option<String>,
    #[serde(default)]
    jobs_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JobList {
    #[serde(default)]
    jobs: Vec<Job>,
}

#[derive(Debug, Deserialize)]
struct Job {
    name: String,
    #[serde(default)]
    status: Option<String>,
}

/// Discovers runs and polls them to convergence
pub struct WorkflowMonitor<'a> {
    client: &'a HostClient,
    interval: Duration,
}

impl<'a> WorkflowMonitor<'a> {
    pub fn new(client: &'a HostClient, interval: Duration) -> Self {
        Self { client, interval }
    }

    /// Find the runs to follow, one list query per repository
    ///
    /// A repository whose run list is not found is reported and contributes
    /// no runs.
    pub async fn discover(
        &self,
        records: &[RepoRecord],
        selector: &Selector,
        reporter: &dyn Reporter,
    ) -> Result<IndexMap<String, Vec<String>>> {
        let mut runs = IndexMap::new();
        for record in records {
            let urls = self.list_runs(&record.name, selector, reporter).await?;
            tracing::debug!(repo = %record.name, runs = urls.len(), %selector, "discovered runs");
            runs.insert(record.name.clone(), urls);
        }
        Ok(runs)
    }

    /// All runs matching `selector`, following pages until `total_count`
    /// runs have been read or a short page comes back
    async fn list_runs(
        &self,
        repo: &str,
        selector: &Selector,
        reporter: &dyn Reporter,
    ) -> Result<Vec<String>> {
        let base = url::Url::parse(&format!("{}/actions/runs", self.client.repo_url(repo)))?;
        let mut urls = Vec::new();
        let mut page = 1usize;

        loop {
            let mut url = base.clone();
            {
                let mut pairs = url.query_pairs_mut();
                for (key, value) in selector.query() {
                    pairs.append_pair(key, &value);
                }
                pairs.append_pair("per_page", &LIST_PAGE_SIZE.to_string());
                pairs.append_pair("page", &page.to_string());
            }

            let reply = self
                .client
                .get(url.as_str(), EndpointKind::WorkflowRuns)
                .await?;
            let list: RunList = match reply.class {
                ResponseClass::Success => reply.json()?,
                ResponseClass::NotFound if page == 1 => {
                    tracing::warn!(%repo, url = %reply.url, "workflow runs not found");
                    reporter.warn(&format!(
                        "Can't list workflow runs for {}, check access to the repository",
                        repo
                    ));
                    return Ok(Vec::new());
                }
                _ => {
                    return Err(HostError::status(
                        EndpointKind::WorkflowRuns,
                        url.as_str(),
                        reply.status,
                    ));
                }
            };

            let returned = list.workflow_runs.len();
            urls.extend(list.workflow_runs.into_iter().map(|r| r.url));
            let total = list.total_count.unwrap_or(urls.len());
            if returned < LIST_PAGE_SIZE || urls.len() >= total {
                return Ok(urls);
            }
            tracing::debug!(%repo, page, read = urls.len(), total, "fetching next page of runs");
            page += 1;
        }
    }

    /// Fetch the current state of every run once
    pub async fn sweep(
        &self,
        runs: &IndexMap<String, Vec<String>>,
        reporter: &dyn Reporter,
    ) -> Result<Vec<WorkflowRef>> {
        let mut refs = Vec::new();
        for (repo, urls) in runs {
            for url in urls {
                refs.push(self.fetch_run(repo, url, reporter).await?);
            }
        }
        Ok(refs)
    }

    async fn fetch_run(&self, repo: &str, url: &str, reporter: &dyn Reporter) -> Result<WorkflowRef> {
        let reply = self.client.get(url, EndpointKind::WorkflowRun).await?;
        let detail: RunDetail = match reply.class {
            ResponseClass::Success => reply.json()?,
            ResponseClass::NotFound => {
                tracing::info!(%repo, %url, "workflow run not found");
                return Ok(WorkflowRef::missing(repo, url));
            }
            _ => {
                return Err(HostError::status(
                    EndpointKind::WorkflowRun,
                    url,
                    reply.status,
                ));
            }
        };

        let mut run = WorkflowRef {
            repo: repo.to_string(),
            run_url: url.to_string(),
            html_url: detail.html_url,
            workflow_id: detail.workflow_id,
            name: detail.name,
            status: detail.status,
            conclusion: detail.conclusion,
            ..Default::default()
        };

        if let Some(jobs_url) = detail.jobs_url {
            let reply = self.client.get(&jobs_url, EndpointKind::WorkflowJobs).await?;
            match reply.class {
                ResponseClass::Success => {
                    let jobs: JobList = reply.json()?;
                    if let Some(job) = jobs.jobs.into_iter().last() {
                        run.job_name = Some(job.name);
                        run.job_status = job.status;
                    }
                }
                ResponseClass::NotFound => {
                    tracing::warn!(%repo, url = %jobs_url, "jobs not found");
                    reporter.warn(&format!("Can't get jobs for {} run {}", repo, url));
                }
                _ => {
                    return Err(HostError::status(
                        EndpointKind::WorkflowJobs,
                        &jobs_url,
                        reply.status,
                    ));
                }
            }
        }
        Ok(run)
    }

    /// Sweep until every run is settled, sleeping between sweeps
    ///
    /// Returns the state observed by the final sweep. A set that is already
    /// settled returns after one sweep without sleeping.
    pub async fn poll_until_converged(
        &self,
        runs: &IndexMap<String, Vec<String>>,
        reporter: &dyn Reporter,
    ) -> Result<Vec<WorkflowRef>> {
        let mut sweeps = 0usize;
        loop {
            let refs = self.sweep(runs, reporter).await?;
            sweeps += 1;
            reporter.table(&status_table(&refs));

            if converged(&refs) {
                tracing::info!(sweeps, runs = refs.len(), "workflows converged");
                return Ok(refs);
            }

            let pending = refs.iter().filter(|r| !r.is_settled()).count();
            tracing::debug!(sweeps, pending, "workflows still running");
            reporter.info(&format!(
                "{} of {} runs still running, checking again in {}s",
                pending,
                refs.len(),
                self.interval.as_secs()
            ));
            tokio::time::sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn run(conclusion: Option<&str>) -> WorkflowRef {
        WorkflowRef {
            repo: "test1".to_string(),
            run_url: "http://host/run/1".to_string(),
            status: Some("completed".to_string()),
            conclusion: conclusion.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_converged_uses_conclusion() {
        assert!(converged(&[]));
        assert!(converged(&[run(Some("success")), run(Some("failure"))]));
        assert!(!converged(&[run(Some("success")), run(None)]));
        // status alone never settles a run
        assert!(!converged(&[run(Some("in_progress"))]));
    }

    #[test]
    fn test_not_found_run_is_settled() {
        let missing = WorkflowRef::missing("test1", "http://host/run/2");
        assert!(converged(&[missing, run(Some("skipped"))]));
    }

    #[test]
    fn test_every_terminal_conclusion() {
        for conclusion in TERMINAL_CONCLUSIONS {
            assert!(is_terminal(conclusion));
        }
        assert!(!is_terminal("neutral"));
        assert!(!is_terminal("stale"));
    }

    #[test]
    fn test_window_bounds() {
        let at = Utc.with_ymd_and_hms(2022, 2, 16, 9, 18, 0).unwrap();
        let (start, end) = window(at);
        assert_eq!(start, "2022-02-16T09:13:00Z");
        assert_eq!(end, "2022-02-16T09:23:00Z");
    }

    #[test]
    fn test_selector_query() {
        let query = Selector::Tag("1.2.4rc2-release1".to_string()).query();
        assert_eq!(query[0], ("event", "push".to_string()));
        assert_eq!(query[1], ("branch", "1.2.4rc2-release1".to_string()));
    }

    #[test]
    fn test_summary() {
        let runs = vec![
            run(Some("success")),
            run(Some("failure")),
            run(Some("skipped")),
            WorkflowRef::missing("test2", "http://host/run/3"),
        ];
        let summary = MonitorSummary::from_runs(&runs);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.other, 1);
        assert_eq!(summary.not_found, 1);
        assert_eq!(
            summary.to_string(),
            "4 runs: 1 succeeded, 1 failed, 1 other, 1 not found"
        );
    }

    #[test]
    fn test_status_table() {
        let mut done = run(Some("success"));
        done.name = Some("CI".to_string());
        done.job_name = Some("publish".to_string());
        let table = status_table(&[done, WorkflowRef::missing("test2", "http://host/run/9")]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][1], "CI");
        assert_eq!(table.rows[0][5], "publish");
        assert_eq!(table.rows[1][3], "not found");
    }
}
