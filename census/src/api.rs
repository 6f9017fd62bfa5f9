use async_trait::async_trait;
use derive_more::Constructor;
use thiserror::Error;

use crate::bot::AccountDetails;
use crate::commit::{CommitRecord, ListedCommit};
use crate::window::TimeWindow;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Error: {0}")]
    Error(&'static str),
    /// Request gave up after its retry budget, or the resource does not exist.
    #[error("Unavailable: {0}")]
    Unavailable(String),
    #[error("Unexpected payload from {url}: {source}")]
    Payload {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Organization repository as listed by the organization repositories endpoint.
#[derive(Debug, Clone, PartialEq, Default, Constructor)]
pub struct Repo {
    pub name: String,
    pub fork: bool,
    pub stargazers_count: u32,
    pub forks_count: u32,
    pub watchers_count: u32,
    pub open_issues_count: u32,
}

#[derive(Debug, Clone, PartialEq, Constructor)]
pub struct Contributor {
    pub login: String,
    pub contributions: u32,
    pub html_url: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserProfile {
    pub login: String,
    pub name: Option<String>,
    pub html_url: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub company: Option<String>,
    pub account_type: Option<String>,
    pub public_repos: u32,
    pub followers: u32,
    pub following: u32,
}

impl UserProfile {
    pub fn account_details(&self) -> AccountDetails {
        AccountDetails {
            account_type: self.account_type.clone(),
            company: self.company.clone(),
        }
    }
}

/// Personal repository of a user.
#[derive(Debug, Clone, PartialEq, Default, Constructor)]
pub struct UserRepo {
    pub name: String,
    pub stargazers_count: u32,
    pub topics: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Constructor)]
pub struct RateLimitStatus {
    pub limit: u32,
    pub remaining: u32,
    /// Unix timestamp of the next quota reset.
    pub reset: i64,
}

/// Remote source-hosting API used by the census pipelines.
///
/// Every method resolves to an error when the underlying request gave up, callers are expected
/// to log it and skip the affected item.
#[async_trait]
pub trait Client: Send + Sync {
    async fn rate_limit(&self) -> Result<RateLimitStatus>;

    async fn org_repos(&self, org: &str, page: u32, per_page: u32) -> Result<Vec<Repo>>;

    async fn repo_contributors(&self, org: &str, repo: &str, page: u32, per_page: u32) -> Result<Vec<Contributor>>;

    async fn repo_commits(
        &self,
        org: &str,
        repo: &str,
        window: &TimeWindow,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<ListedCommit>>;

    async fn commit_detail(&self, org: &str, repo: &str, sha: &str) -> Result<CommitRecord>;

    async fn user(&self, login: &str) -> Result<UserProfile>;

    async fn user_repos(&self, login: &str, per_page: u32) -> Result<Vec<UserRepo>>;

    /// Returns a login only when exactly one account matches `email`.
    async fn search_user_by_email(&self, email: &str) -> Result<Option<String>>;
}

/// Local copy of user avatars.
#[async_trait]
pub trait AvatarStore: Send + Sync {
    /// Makes sure the avatar of `login` is stored, returns its path relative to the site root.
    async fn store(&self, login: &str, avatar_url: &str) -> Result<String>;
}
