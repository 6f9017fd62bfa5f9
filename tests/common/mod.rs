use std::path::Path;

use clap::Parser;
use org_census_app::Args;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ORG: &str = "acme";

/// Arguments pointing every directory under `root` and the API at `server`.
pub fn args(server: &MockServer, root: &Path, command: &[&str]) -> Args {
    let root = root.display().to_string();
    let mut argv = vec![
        "org_census".to_string(),
        "--org".to_string(),
        ORG.to_string(),
        "--api-url".to_string(),
        server.uri(),
        "--output-dir".to_string(),
        format!("{}/data", root),
        "--avatars-dir".to_string(),
        format!("{}/avatars", root),
        "--cache-dir".to_string(),
        format!("{}/cache", root),
    ];
    argv.extend(command.iter().map(|arg| arg.to_string()));
    Args::try_parse_from(argv).unwrap()
}

pub async fn mock_rate_limit(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rate_limit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resources": {"core": {"limit": 5000, "remaining": 4990, "reset": 1700000000}}
        })))
        .mount(server)
        .await;
}

pub async fn mock_repos(server: &MockServer, repos: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/orgs/{}/repos", ORG)))
        .respond_with(ResponseTemplate::new(200).set_body_json(repos))
        .mount(server)
        .await;
}

pub fn commit(sha: &str, login: Option<&str>, name: &str, email: &str, date: &str) -> Value {
    json!({
        "sha": sha,
        "html_url": format!("https://github.com/{}/commit/{}", ORG, sha),
        "author": login.map(|login| json!({"login": login})),
        "commit": {
            "author": {"name": name, "email": email, "date": date},
            "message": format!("Update {}", sha)
        }
    })
}

pub fn with_files(mut commit: Value, additions: u32) -> Value {
    commit["files"] = json!([{"filename": "README.md", "additions": additions, "deletions": 0, "changes": additions}]);
    commit
}

pub fn read_json(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}
