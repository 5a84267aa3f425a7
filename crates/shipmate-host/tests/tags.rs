//! Tag publication against a mock host

use serde_json::json;
use shipmate_core::{FailureKind, RepoRecord, SourceRef, TagType};
use shipmate_host::{HostClient, HostError, TagPublisher, Token};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SHA: &str = "96a36e779da8f8074b8ab252c25d536a99f10645";
const TAG: &str = "20220216-0918-develop1";

fn tagged_record() -> RepoRecord {
    let mut record = RepoRecord::new(
        "test1",
        SourceRef::Branch("develop".to_string()),
        "develop1",
        TagType::Calver,
    );
    record.set_commit(SHA).unwrap();
    record.set_tag(TAG).unwrap();
    record
}

fn client(server: &MockServer, token: Option<&str>) -> HostClient {
    HostClient::new(server.uri(), "ssl-hep", token.map(Token::new)).unwrap()
}

async fn mount_commit(server: &MockServer, status: u16) {
    Mock::given(method("GET"))
        .and(path(format!("/repos/ssl-hep/test1/commits/{}", SHA)))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_publish_creates_object_then_ref() {
    let server = MockServer::start().await;
    mount_commit(&server, 200).await;
    Mock::given(method("POST"))
        .and(path("/repos/ssl-hep/test1/git/tags"))
        .and(body_partial_json(json!({
            "tag": TAG,
            "message": "Tagged using shipmate",
            "object": SHA,
            "type": "commit"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sha": "tagobj123" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/ssl-hep/test1/git/refs"))
        .and(body_partial_json(json!({
            "ref": format!("refs/tags/{}", TAG),
            "sha": "tagobj123"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, Some("ghp_testtoken"));
    let published = TagPublisher::new(&client, "Tagged using shipmate")
        .publish(&tagged_record())
        .await
        .unwrap();

    assert_eq!(published.tag, TAG);
    assert_eq!(published.commit, SHA);
    assert_eq!(published.object_sha, "tagobj123");
}

#[tokio::test]
async fn test_ref_never_created_when_object_fails() {
    let server = MockServer::start().await;
    mount_commit(&server, 200).await;
    Mock::given(method("POST"))
        .and(path("/repos/ssl-hep/test1/git/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "sha": "x" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/ssl-hep/test1/git/refs"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let client = client(&server, Some("ghp_testtoken"));
    let err = TagPublisher::new(&client, "msg")
        .publish(&tagged_record())
        .await
        .unwrap_err();
    assert!(matches!(err, HostError::UnexpectedStatus { status: 200, .. }));
}

#[tokio::test]
async fn test_ref_failure_is_reported() {
    let server = MockServer::start().await;
    mount_commit(&server, 200).await;
    Mock::given(method("POST"))
        .and(path("/repos/ssl-hep/test1/git/tags"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sha": "tagobj" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/ssl-hep/test1/git/refs"))
        .respond_with(ResponseTemplate::new(422))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, Some("ghp_testtoken"));
    let err = TagPublisher::new(&client, "msg")
        .publish(&tagged_record())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::Invalid);
}

#[tokio::test]
async fn test_malformed_token_stops_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let client = client(&server, Some("not-a-token"));
    let err = TagPublisher::new(&client, "msg")
        .publish(&tagged_record())
        .await
        .unwrap_err();
    assert!(matches!(err, HostError::InvalidToken));

    let client = HostClient::new(server.uri(), "ssl-hep", None).unwrap();
    let err = TagPublisher::new(&client, "msg")
        .publish(&tagged_record())
        .await
        .unwrap_err();
    assert!(matches!(err, HostError::MissingToken { .. }));
}

#[tokio::test]
async fn test_unresolved_record_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let mut record = RepoRecord::new(
        "test1",
        SourceRef::Branch("develop".to_string()),
        "develop1",
        TagType::Calver,
    );
    record.set_tag(TAG).unwrap();

    let client = client(&server, Some("ghp_testtoken"));
    let err = TagPublisher::new(&client, "msg")
        .publish(&record)
        .await
        .unwrap_err();
    assert!(matches!(err, HostError::MissingCommit { .. }));
    assert_eq!(err.kind(), FailureKind::LocalValidation);
}

#[tokio::test]
async fn test_unknown_commit_is_rejected() {
    let server = MockServer::start().await;
    mount_commit(&server, 404).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let client = client(&server, Some("ghp_testtoken"));
    let err = TagPublisher::new(&client, "msg")
        .publish(&tagged_record())
        .await
        .unwrap_err();
    assert!(matches!(err, HostError::CommitNotFound { .. }));
}
