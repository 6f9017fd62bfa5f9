use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::api::{AvatarStore, Client, Contributor, Error, RateLimitStatus, Repo, Result, UserProfile, UserRepo};
use crate::commit::{CommitAuthor, CommitRecord, FileChange, ListedCommit};
use crate::window::TimeWindow;

/// In-memory organization served page by page.
#[derive(Default)]
pub struct FakeClient {
    pub repos: Vec<Repo>,
    pub contributors: HashMap<String, Vec<Contributor>>,
    pub commits: HashMap<String, Vec<ListedCommit>>,
    pub details: HashMap<String, CommitRecord>,
    pub users: HashMap<String, UserProfile>,
    pub user_repos: HashMap<String, Vec<UserRepo>>,
    pub emails: HashMap<String, String>,
    pub failing_repos: Vec<String>,
    pub calls: Mutex<Vec<String>>,
    /// Reads the file when commits of the repository are first listed.
    pub snapshot_on: Option<(String, PathBuf)>,
    pub snapshot: Mutex<Option<String>>,
}

impl FakeClient {
    pub fn repo(mut self, name: &str, stars: u32, forks: u32) -> Self {
        self.repos.push(Repo::new(name.to_string(), false, stars, forks, stars, 0));
        self
    }

    pub fn fork(mut self, name: &str) -> Self {
        self.repos.push(Repo::new(name.to_string(), true, 0, 0, 0, 0));
        self
    }

    pub fn contributor(mut self, repo: &str, login: &str, contributions: u32) -> Self {
        self.contributors.entry(repo.to_string()).or_default().push(Contributor::new(
            login.to_string(),
            contributions,
            format!("https://github.com/{}", login),
            Some(format!("https://avatars.example.com/{}", login)),
        ));
        self
    }

    /// Listed commit with its detail carrying one file of `additions` lines.
    pub fn commit(mut self, repo: &str, sha: &str, author: CommitAuthor, date: DateTime<Utc>, additions: u32) -> Self {
        let listed = ListedCommit {
            full_sha: sha.to_string(),
            login: author.login.clone(),
            avatar_url: None,
            record: CommitRecord::new(
                sha,
                repo,
                author.clone(),
                date,
                "Update",
                Some(format!("https://github.com/org/{}/commit/{}", repo, sha)),
                Vec::new(),
            ),
        };
        let detail = CommitRecord::new(
            sha,
            repo,
            author,
            date,
            "Update",
            None,
            vec![FileChange {
                filename: "README.md".to_string(),
                additions,
                deletions: 0,
                changes: additions,
            }],
        );
        self.commits.entry(repo.to_string()).or_default().push(listed);
        self.details.insert(sha.to_string(), detail);
        self
    }

    pub fn user(mut self, profile: UserProfile, repos: Vec<UserRepo>) -> Self {
        self.user_repos.insert(profile.login.clone(), repos);
        self.users.insert(profile.login.clone(), profile);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|call| call.starts_with(prefix)).count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn fail_for(&self, repo: &str) -> Result<()> {
        if self.failing_repos.iter().any(|failing| failing == repo) {
            return Err(Error::Unavailable(repo.to_string()));
        }
        Ok(())
    }
}

fn page_of<T: Clone>(items: &[T], page: u32, per_page: u32) -> Vec<T> {
    items
        .iter()
        .skip(((page - 1) * per_page) as usize)
        .take(per_page as usize)
        .cloned()
        .collect()
}

pub fn author(login: Option<&str>, name: &str, email: &str) -> CommitAuthor {
    CommitAuthor {
        login: login.map(str::to_string),
        name: name.to_string(),
        email: email.to_string(),
    }
}

#[async_trait]
impl Client for FakeClient {
    async fn rate_limit(&self) -> Result<RateLimitStatus> {
        self.record("rate_limit".to_string());
        Ok(RateLimitStatus::new(5000, 4999, 0))
    }

    async fn org_repos(&self, org: &str, page: u32, per_page: u32) -> Result<Vec<Repo>> {
        self.record(format!("org_repos {} {}", org, page));
        Ok(page_of(&self.repos, page, per_page))
    }

    async fn repo_contributors(&self, _org: &str, repo: &str, page: u32, per_page: u32) -> Result<Vec<Contributor>> {
        self.record(format!("contributors {} {}", repo, page));
        self.fail_for(repo)?;
        Ok(page_of(self.contributors.get(repo).map(Vec::as_slice).unwrap_or_default(), page, per_page))
    }

    async fn repo_commits(
        &self,
        _org: &str,
        repo: &str,
        window: &TimeWindow,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<ListedCommit>> {
        self.record(format!("commits {} {}", repo, page));
        if let Some((snapshot_repo, file)) = &self.snapshot_on {
            if snapshot_repo == repo && page == 1 {
                *self.snapshot.lock().unwrap() = std::fs::read_to_string(file).ok();
            }
        }
        self.fail_for(repo)?;
        let in_window: Vec<ListedCommit> = self
            .commits
            .get(repo)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .filter(|listed| {
                listed.record.date >= window.since && window.until.map_or(true, |until| listed.record.date <= until)
            })
            .cloned()
            .collect();
        Ok(page_of(&in_window, page, per_page))
    }

    async fn commit_detail(&self, _org: &str, repo: &str, sha: &str) -> Result<CommitRecord> {
        self.record(format!("commit_detail {} {}", repo, sha));
        self.details
            .get(sha)
            .cloned()
            .ok_or_else(|| Error::Unavailable(sha.to_string()))
    }

    async fn user(&self, login: &str) -> Result<UserProfile> {
        self.record(format!("user {}", login));
        self.users
            .get(login)
            .cloned()
            .ok_or_else(|| Error::Unavailable(login.to_string()))
    }

    async fn user_repos(&self, login: &str, _per_page: u32) -> Result<Vec<UserRepo>> {
        self.record(format!("user_repos {}", login));
        Ok(self.user_repos.get(login).cloned().unwrap_or_default())
    }

    async fn search_user_by_email(&self, email: &str) -> Result<Option<String>> {
        self.record(format!("search {}", email));
        Ok(self.emails.get(email).cloned())
    }
}

/// Avatar store that only remembers what it was asked to store.
#[derive(Default)]
pub struct FakeAvatars {
    pub stored: Mutex<Vec<String>>,
}

#[async_trait]
impl AvatarStore for FakeAvatars {
    async fn store(&self, login: &str, _avatar_url: &str) -> Result<String> {
        self.stored.lock().unwrap().push(login.to_string());
        Ok(format!("avatars/{}.jpg", login))
    }
}
