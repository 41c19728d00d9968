//! Integration tests for GitLabClient using wiremock.
//!
//! Each test points the client at a mock server through the credential
//! provider and checks both the requests sent and the results returned.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;

use kanlab_auth::{DisabledCredentials, MemoryCredentials, StaticCredentials};
use kanlab_services::{BoardFailurePolicy, GitLabClient, GitLabError, ProjectId};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "glpat-test-token";

fn client_for(server: &MockServer) -> GitLabClient {
    GitLabClient::new(Arc::new(StaticCredentials::new(server.uri(), TOKEN))).unwrap()
}

fn unconfigured_client() -> GitLabClient {
    GitLabClient::new(Arc::new(StaticCredentials::empty())).unwrap()
}

/// Helper to create a test project JSON
fn test_project(id: u64, path: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": path.rsplit('/').next().unwrap_or(path),
        "path_with_namespace": path,
        "web_url": format!("https://gitlab.example.com/{}", path),
        "default_branch": "main"
    })
}

/// Helper to create a test issue JSON with detailed labels
fn test_issue(iid: u64, labels: &[&str]) -> serde_json::Value {
    let labels: Vec<_> = labels
        .iter()
        .enumerate()
        .map(|(i, name)| serde_json::json!({"id": i + 1, "name": name, "color": "#428bca"}))
        .collect();
    serde_json::json!({
        "id": 1000 + iid,
        "iid": iid,
        "project_id": 42,
        "title": format!("Issue {}", iid),
        "state": "opened",
        "labels": labels
    })
}

fn test_list(id: u64, label: &str, position: i64) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "label": {"id": id * 10, "name": label, "color": "#F0AD4E"},
        "position": position,
        "list_type": "label"
    })
}

#[tokio::test]
async fn test_get_projects_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v4/projects"))
        .and(query_param("membership", "true"))
        .and(query_param("per_page", "100"))
        .and(header("PRIVATE-TOKEN", TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            test_project(1, "group/alpha"),
            test_project(2, "group/beta"),
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let projects = client_for(&mock_server).get_projects().await.unwrap();

    assert_eq!(projects.len(), 2);
    assert_eq!(projects[0].id, 1);
    assert_eq!(projects[1].path_with_namespace.as_deref(), Some("group/beta"));
    assert_eq!(projects[0].extra["default_branch"], "main");
}

#[tokio::test]
async fn test_get_project_issues_requests_label_details() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v4/projects/42/issues"))
        .and(query_param("per_page", "100"))
        .and(query_param("with_labels_details", "true"))
        .and(header("PRIVATE-TOKEN", TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            test_issue(7, &["bug", "urgent"]),
            test_issue(8, &[]),
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let issues = client_for(&mock_server).get_project_issues(42).await.unwrap();

    assert_eq!(issues.len(), 2);
    assert_eq!(issues[0].iid, 7);
    assert_eq!(issues[0].label_names(), vec!["bug", "urgent"]);
    assert!(issues[1].labels.is_empty());
}

#[tokio::test]
async fn test_path_project_id_is_encoded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v4/projects/group%2Fapp/issues"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let issues = client_for(&mock_server)
        .get_project_issues(ProjectId::from("group/app"))
        .await
        .unwrap();
    assert!(issues.is_empty());
}

#[tokio::test]
async fn test_update_issue_labels_sends_comma_joined_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/api/v4/projects/42/issues/7"))
        .and(header("PRIVATE-TOKEN", TOKEN))
        .and(body_json(serde_json::json!({"labels": "bug,urgent"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(test_issue(7, &["bug", "urgent"])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let issue = client_for(&mock_server)
        .update_issue_labels(42, 7, &["bug", "urgent"])
        .await
        .unwrap();

    assert_eq!(issue.iid, 7);
    assert_eq!(issue.label_names(), vec!["bug", "urgent"]);
}

#[tokio::test]
async fn test_update_issue_labels_remote_error_propagates() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/api/v4/projects/42/issues/7"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(serde_json::json!({"message": "403 Forbidden"})),
        )
        .mount(&mock_server)
        .await;

    let err = client_for(&mock_server)
        .update_issue_labels(42, 7, &["bug"])
        .await
        .unwrap_err();

    match err {
        GitLabError::Remote {
            status,
            status_text,
            body,
        } => {
            assert_eq!(status, 403);
            assert_eq!(status_text, "Forbidden");
            assert!(body.contains("403 Forbidden"));
        }
        other => panic!("expected remote error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_get_projects_remote_error_propagates() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v4/projects"))
        .respond_with(ResponseTemplate::new(401).set_body_string("401 Unauthorized"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let err = client_for(&mock_server).get_projects().await.unwrap_err();
    assert_eq!(err.status(), Some(401));
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v4/projects"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&mock_server)
        .await;

    let err = client_for(&mock_server).get_projects().await.unwrap_err();
    assert!(matches!(err, GitLabError::Decode(_)));
}

#[tokio::test]
async fn test_transport_failure_on_update() {
    // Nothing listens on port 1
    let creds = StaticCredentials::new("http://127.0.0.1:1", TOKEN);
    let client = GitLabClient::new(Arc::new(creds)).unwrap();

    let err = client.update_issue_labels(42, 7, &["bug"]).await.unwrap_err();
    assert!(matches!(err, GitLabError::Transport(_)));
}

#[tokio::test]
async fn test_missing_config_reads_are_empty() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    for client in [
        unconfigured_client(),
        GitLabClient::new(Arc::new(DisabledCredentials)).unwrap(),
        GitLabClient::new(Arc::new(StaticCredentials::new("", TOKEN))).unwrap(),
        GitLabClient::new(Arc::new(StaticCredentials::new(mock_server.uri(), ""))).unwrap(),
    ] {
        assert!(client.get_projects().await.unwrap().is_empty());
        assert!(client.get_project_issues(42).await.unwrap().is_empty());
        assert!(client.get_project_board_lists(42).await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_missing_config_update_rejects() {
    let err = unconfigured_client()
        .update_issue_labels(42, 7, &["bug", "urgent"])
        .await
        .unwrap_err();

    assert!(err.is_configuration_missing());
}

#[tokio::test]
async fn test_board_lists_without_boards_skips_lists_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v4/projects/42/boards"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(wiremock::matchers::path_regex(r"^/api/v4/projects/42/boards/\d+/lists$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let lists = client_for(&mock_server)
        .get_project_board_lists(42)
        .await
        .unwrap();
    assert!(lists.is_empty());
}

#[tokio::test]
async fn test_board_lists_uses_first_board_only() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v4/projects/42/boards"))
        .and(header("PRIVATE-TOKEN", TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"id": 9, "name": "Development"},
            {"id": 10, "name": "Support"}
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v4/projects/42/boards/9/lists"))
        .and(header("PRIVATE-TOKEN", TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            test_list(1, "todo", 0),
            test_list(2, "doing", 1),
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v4/projects/42/boards/10/lists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let lists = client_for(&mock_server)
        .get_project_board_lists(42)
        .await
        .unwrap();

    assert_eq!(lists.len(), 2);
    assert_eq!(lists[1].label.as_ref().map(|l| l.name.as_str()), Some("doing"));
    assert_eq!(lists[1].position, Some(1));
}

#[tokio::test]
async fn test_board_lists_failure_degrades_to_empty() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v4/projects/42/boards"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{"id": 9}])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v4/projects/42/boards/9/lists"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({"message": "404 Not found"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let lists = client_for(&mock_server)
        .get_project_board_lists(42)
        .await
        .unwrap();
    assert!(lists.is_empty());
}

#[tokio::test]
async fn test_board_lookup_failure_degrades_to_empty() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v4/projects/42/boards"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    let lists = client_for(&mock_server)
        .get_project_board_lists(42)
        .await
        .unwrap();
    assert!(lists.is_empty());
}

#[tokio::test]
async fn test_board_lists_failure_propagates_when_configured() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v4/projects/42/boards"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{"id": 9}])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v4/projects/42/boards/9/lists"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let err = client_for(&mock_server)
        .with_board_policy(BoardFailurePolicy::Propagate)
        .get_project_board_lists(42)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_rotated_credentials_apply_to_next_call() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v4/projects"))
        .and(header("PRIVATE-TOKEN", "rotated-token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!([test_project(5, "g/p")])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let creds = Arc::new(MemoryCredentials::new());
    let client = GitLabClient::new(creds.clone()).unwrap();

    assert!(client.get_projects().await.unwrap().is_empty());

    creds.set(mock_server.uri(), "rotated-token");
    let projects = client.get_projects().await.unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].id, 5);
}

#[tokio::test]
async fn test_concurrent_reads_share_one_client() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v4/projects/1/issues"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([test_issue(1, &["a"])])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v4/projects/2/issues"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([test_issue(2, &["b"]), test_issue(3, &[])])))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let (first, second) = tokio::join!(client.get_project_issues(1), client.get_project_issues(2));

    assert_eq!(first.unwrap().len(), 1);
    assert_eq!(second.unwrap().len(), 2);
}

fn unreachable_client() -> GitLabClient {
    // Nothing listens on port 1
    GitLabClient::new(Arc::new(StaticCredentials::new("http://127.0.0.1:1", TOKEN))).unwrap()
}

#[tokio::test]
async fn test_transport_failure_on_get_projects_propagates() {
    let err = unreachable_client().get_projects().await.unwrap_err();
    assert!(matches!(err, GitLabError::Transport(_)));
}

#[tokio::test]
async fn test_board_lookup_transport_failure_degrades_to_empty() {
    let lists = unreachable_client()
        .get_project_board_lists(42)
        .await
        .unwrap();
    assert!(lists.is_empty());
}

#[tokio::test]
async fn test_board_lookup_transport_failure_propagates_when_configured() {
    let err = unreachable_client()
        .with_board_policy(BoardFailurePolicy::Propagate)
        .get_project_board_lists(42)
        .await
        .unwrap_err();
    assert!(matches!(err, GitLabError::Transport(_)));
}
