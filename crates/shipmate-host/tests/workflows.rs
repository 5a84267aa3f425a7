//! Workflow discovery and polling against a mock host

use chrono::{TimeZone, Utc};
use indexmap::IndexMap;
use serde_json::json;
use shipmate_core::{NullReporter, RecordingReporter, RepoRecord, SourceRef, TagType};
use shipmate_host::{HostClient, HostError, Selector, WorkflowMonitor};
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> HostClient {
    HostClient::new(server.uri(), "ssl-hep", None).unwrap()
}

fn record(name: &str) -> RepoRecord {
    RepoRecord::new(
        name,
        SourceRef::Branch("develop".to_string()),
        "develop1",
        TagType::Calver,
    )
}

fn run_body(server: &MockServer, id: u32, status: &str, conclusion: Option<&str>) -> serde_json::Value {
    json!({
        "id": id,
        "workflow_id": 42,
        "name": "CI",
        "status": status,
        "conclusion": conclusion,
        "html_url": format!("https://github.com/ssl-hep/test1/actions/runs/{}", id),
        "jobs_url": format!("{}/repos/ssl-hep/test1/actions/runs/{}/jobs", server.uri(), id)
    })
}

async fn mount_jobs(server: &MockServer, id: u32) {
    Mock::given(method("GET"))
        .and(path(format!("/repos/ssl-hep/test1/actions/runs/{}/jobs", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 2,
            "jobs": [
                { "name": "build", "status": "completed" },
                { "name": "publish", "status": "in_progress" }
            ]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_discover_by_tag() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/ssl-hep/test1/actions/runs"))
        .and(query_param("event", "push"))
        .and(query_param("branch", "1.2.4rc2-release1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 1,
            "workflow_runs": [
                { "url": format!("{}/repos/ssl-hep/test1/actions/runs/1", server.uri()) }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let monitor = WorkflowMonitor::new(&client, Duration::from_millis(10));
    let runs = monitor
        .discover(
            &[record("test1")],
            &Selector::Tag("1.2.4rc2-release1".to_string()),
            &NullReporter,
        )
        .await
        .unwrap();

    assert_eq!(runs.len(), 1);
    assert_eq!(runs["test1"].len(), 1);
    assert!(runs["test1"][0].ends_with("/actions/runs/1"));
}

#[tokio::test]
async fn test_discover_by_window() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/ssl-hep/test1/actions/runs"))
        .and(query_param(
            "created",
            "2022-02-16T09:13:00Z..2022-02-16T09:23:00Z",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 0,
            "workflow_runs": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let at = Utc.with_ymd_and_hms(2022, 2, 16, 9, 18, 0).unwrap();
    let runs = WorkflowMonitor::new(&client, Duration::from_millis(10))
        .discover(&[record("test1")], &Selector::Window(at), &NullReporter)
        .await
        .unwrap();
    assert_eq!(runs["test1"], Vec::<String>::new());
}

fn run_page(server: &MockServer, ids: std::ops::Range<u32>, total: u32) -> serde_json::Value {
    let runs: Vec<_> = ids
        .map(|id| json!({ "url": format!("{}/repos/ssl-hep/test1/actions/runs/{}", server.uri(), id) }))
        .collect();
    json!({ "total_count": total, "workflow_runs": runs })
}

#[tokio::test]
async fn test_discover_follows_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/ssl-hep/test1/actions/runs"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(run_page(&server, 0..100, 101)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/ssl-hep/test1/actions/runs"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(run_page(&server, 100..101, 101)))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let at = Utc.with_ymd_and_hms(2022, 2, 16, 9, 18, 0).unwrap();
    let runs = WorkflowMonitor::new(&client, Duration::from_millis(10))
        .discover(&[record("test1")], &Selector::Window(at), &NullReporter)
        .await
        .unwrap();
    assert_eq!(runs["test1"].len(), 101);
    assert!(runs["test1"][100].ends_with("/actions/runs/100"));
}

#[tokio::test]
async fn test_discover_not_found_warns_and_continues() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/ssl-hep/private/actions/runs"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/ssl-hep/test1/actions/runs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "workflow_runs": [] })))
        .mount(&server)
        .await;

    let client = client(&server);
    let reporter = RecordingReporter::new();
    let runs = WorkflowMonitor::new(&client, Duration::from_millis(10))
        .discover(
            &[record("private"), record("test1")],
            &Selector::Tag("t".to_string()),
            &reporter,
        )
        .await
        .unwrap();

    assert_eq!(runs.len(), 2);
    assert!(runs["private"].is_empty());
    assert_eq!(reporter.warnings().len(), 1);
    assert!(reporter.warnings()[0].contains("private"));
}

#[tokio::test]
async fn test_discover_server_error_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/ssl-hep/test1/actions/runs"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = client(&server);
    let err = WorkflowMonitor::new(&client, Duration::from_millis(10))
        .discover(&[record("test1")], &Selector::Tag("t".to_string()), &NullReporter)
        .await
        .unwrap_err();
    assert!(matches!(err, HostError::UnexpectedStatus { status: 500, .. }));
}

#[tokio::test]
async fn test_settled_runs_return_without_sleeping() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/ssl-hep/test1/actions/runs/1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(run_body(&server, 1, "completed", Some("success"))),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_jobs(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/repos/ssl-hep/test1/actions/runs/2"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let mut runs = IndexMap::new();
    runs.insert(
        "test1".to_string(),
        vec![
            format!("{}/repos/ssl-hep/test1/actions/runs/1", server.uri()),
            format!("{}/repos/ssl-hep/test1/actions/runs/2", server.uri()),
        ],
    );

    let client = client(&server);
    let monitor = WorkflowMonitor::new(&client, Duration::from_secs(3600));
    let reporter = RecordingReporter::new();
    let refs = tokio::time::timeout(
        Duration::from_secs(10),
        monitor.poll_until_converged(&runs, &reporter),
    )
    .await
    .expect("polling slept on a settled run set")
    .unwrap();

    assert_eq!(refs.len(), 2);
    assert_eq!(refs[0].conclusion.as_deref(), Some("success"));
    assert_eq!(refs[0].job_name.as_deref(), Some("publish"));
    assert_eq!(refs[0].job_status.as_deref(), Some("in_progress"));
    assert!(refs[1].not_found);
    assert_eq!(reporter.tables().len(), 1);
}

#[tokio::test]
async fn test_empty_run_set_converges_immediately() {
    let server = MockServer::start().await;
    let client = client(&server);
    let monitor = WorkflowMonitor::new(&client, Duration::from_secs(3600));

    let mut runs = IndexMap::new();
    runs.insert("test1".to_string(), Vec::new());
    let refs = tokio::time::timeout(
        Duration::from_secs(5),
        monitor.poll_until_converged(&runs, &NullReporter),
    )
    .await
    .expect("polling slept on an empty run set")
    .unwrap();
    assert!(refs.is_empty());
}

#[tokio::test]
async fn test_polls_until_conclusion_is_terminal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/ssl-hep/test1/actions/runs/7"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(run_body(&server, 7, "in_progress", None)),
        )
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/ssl-hep/test1/actions/runs/7"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(run_body(&server, 7, "completed", Some("failure"))),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_jobs(&server, 7).await;

    let mut runs = IndexMap::new();
    runs.insert(
        "test1".to_string(),
        vec![format!("{}/repos/ssl-hep/test1/actions/runs/7", server.uri())],
    );

    let client = client(&server);
    let reporter = RecordingReporter::new();
    let refs = WorkflowMonitor::new(&client, Duration::from_millis(10))
        .poll_until_converged(&runs, &reporter)
        .await
        .unwrap();

    assert_eq!(refs[0].conclusion.as_deref(), Some("failure"));
    assert_eq!(reporter.tables().len(), 3);
}

#[tokio::test]
async fn test_missing_jobs_leave_job_columns_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/ssl-hep/test1/actions/runs/3"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(run_body(&server, 3, "completed", Some("success"))),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/ssl-hep/test1/actions/runs/3/jobs"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let mut runs = IndexMap::new();
    runs.insert(
        "test1".to_string(),
        vec![format!("{}/repos/ssl-hep/test1/actions/runs/3", server.uri())],
    );

    let client = client(&server);
    let reporter = RecordingReporter::new();
    let refs = WorkflowMonitor::new(&client, Duration::from_millis(10))
        .sweep(&runs, &reporter)
        .await
        .unwrap();

    assert!(refs[0].job_name.is_none());
    assert!(refs[0].job_status.is_none());
    assert_eq!(reporter.warnings().len(), 1);
}

#[tokio::test]
async fn test_jobs_server_error_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/ssl-hep/test1/actions/runs/5"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(run_body(&server, 5, "completed", Some("success"))),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/ssl-hep/test1/actions/runs/5/jobs"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let mut runs = IndexMap::new();
    runs.insert(
        "test1".to_string(),
        vec![format!("{}/repos/ssl-hep/test1/actions/runs/5", server.uri())],
    );

    let client = client(&server);
    let reporter = RecordingReporter::new();
    let err = WorkflowMonitor::new(&client, Duration::from_millis(10))
        .poll_until_converged(&runs, &reporter)
        .await
        .unwrap_err();

    assert!(matches!(err, HostError::UnexpectedStatus { status: 500, .. }));
    assert!(reporter.tables().is_empty());
}

#[tokio::test]
async fn test_run_server_error_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/ssl-hep/test1/actions/runs/4"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut runs = IndexMap::new();
    runs.insert(
        "test1".to_string(),
        vec![format!("{}/repos/ssl-hep/test1/actions/runs/4", server.uri())],
    );

    let client = client(&server);
    let err = WorkflowMonitor::new(&client, Duration::from_millis(10))
        .poll_until_converged(&runs, &NullReporter)
        .await
        .unwrap_err();
    assert!(matches!(err, HostError::UnexpectedStatus { status: 500, .. }));
}
