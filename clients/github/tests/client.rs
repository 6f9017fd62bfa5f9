use std::sync::Arc;

use chrono::{TimeZone, Utc};
use org_census::api::{Client, Error};
use org_census::window::{Quarter, TimeWindow};
use org_census_github_client::{GithubClient, GithubClientBuilder, ManualClock};
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> GithubClient {
    GithubClientBuilder::default()
        .try_with_token(&SecretString::new("secret".to_string()))
        .unwrap()
        .with_api_url(server.uri())
        .with_clock(Arc::new(ManualClock::new(Utc::now())))
        .build()
        .unwrap()
}

#[tokio::test]
async fn lists_public_org_repos_with_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orgs/acme/repos"))
        .and(query_param("type", "public"))
        .and(query_param("sort", "updated"))
        .and(query_param("page", "2"))
        .and(query_param("per_page", "100"))
        .and(header("authorization", "Bearer secret"))
        .and(header("accept", "application/vnd.github+json"))
        .and(header("x-github-api-version", "2022-11-28"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "book", "fork": false, "stargazers_count": 12, "forks_count": 3},
            {"name": "mirror", "fork": true}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let repos = client(&server).org_repos("acme", 2, 100).await.unwrap();
    assert_eq!(repos.len(), 2);
    assert_eq!(repos[0].name, "book");
    assert_eq!(repos[0].stargazers_count, 12);
    assert_eq!(repos[0].watchers_count, 0);
    assert!(repos[1].fork);
}

#[tokio::test]
async fn lists_commits_inside_quarter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/book/commits"))
        .and(query_param("since", "2025-04-01T00:00:00Z"))
        .and(query_param("until", "2025-07-01T00:00:00Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "sha": "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
            "author": {"login": "alice", "avatar_url": "https://avatars/alice"},
            "commit": {
                "author": {"name": "Alice", "email": "alice@example.com", "date": "2025-05-01T10:00:00Z"},
                "message": "Fix typo"
            }
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let window = Quarter::new(2025, 2).unwrap().window();
    let commits = client(&server).repo_commits("acme", "book", &window, 1, 100).await.unwrap();
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0].full_sha, "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
    assert_eq!(commits[0].record.sha, "aaaaaaaa");
    assert_eq!(commits[0].avatar_url.as_deref(), Some("https://avatars/alice"));
}

#[tokio::test]
async fn recent_window_has_no_upper_bound() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/book/commits"))
        .and(query_param("since", "2025-05-01T00:00:00Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let window = TimeWindow::last_days(Utc.with_ymd_and_hms(2025, 5, 8, 0, 0, 0).unwrap(), 7);
    let commits = client(&server).repo_commits("acme", "book", &window, 1, 100).await.unwrap();
    assert!(commits.is_empty());
    let requests = server.received_requests().await.unwrap();
    assert!(!requests[0].url.query().unwrap_or_default().contains("until"));
}

#[tokio::test]
async fn commit_detail_keeps_file_changes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/book/commits/bbbbbbbbbbbb"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sha": "bbbbbbbbbbbb",
            "html_url": "https://github.com/acme/book/commit/bbbbbbbbbbbb",
            "author": null,
            "commit": {
                "author": {"name": "Dave", "email": "123+dave@users.noreply.github.com", "date": "2025-05-02T01:30:00Z"},
                "message": "Chapter 2\n\nDraft"
            },
            "files": [{"filename": "ch2.md", "additions": 120, "deletions": 4, "changes": 124}]
        })))
        .mount(&server)
        .await;

    let record = client(&server).commit_detail("acme", "book", "bbbbbbbbbbbb").await.unwrap();
    assert_eq!(record.message, "Chapter 2");
    assert_eq!(record.author.login, None);
    assert_eq!(record.total_additions(), 120);
    assert!(record.is_valid(10));
}

#[tokio::test]
async fn missing_user_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/ghost"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server).user("ghost").await;
    assert!(matches!(result, Err(Error::Unavailable(_))));
}

#[tokio::test]
async fn unexpected_shape_is_a_payload_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/alice/repos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "not a list"})))
        .mount(&server)
        .await;

    let result = client(&server).user_repos("alice", 100).await;
    assert!(matches!(result, Err(Error::Payload { .. })));
}

#[tokio::test]
async fn searches_users_by_email() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/users"))
        .and(query_param("q", "erin@example.com in:email"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 1,
            "items": [{"login": "erin-gh"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let login = client(&server).search_user_by_email("erin@example.com").await.unwrap();
    assert_eq!(login.as_deref(), Some("erin-gh"));
}

#[tokio::test]
async fn reads_core_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rate_limit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resources": {
                "core": {"limit": 5000, "remaining": 42, "reset": 1700000000, "used": 4958},
                "search": {"limit": 30, "remaining": 30, "reset": 1700000000, "used": 0}
            }
        })))
        .mount(&server)
        .await;

    let status = client(&server).rate_limit().await.unwrap();
    assert_eq!(status.limit, 5000);
    assert_eq!(status.remaining, 42);
    assert_eq!(status.reset, 1_700_000_000);
}
